//! Error types.
//!
//! None of these escape the public entry points (`render`, `dispatch`, effect
//! execution). They exist so internal layers can propagate with `?` and the
//! boundary can decide how to degrade.

use thiserror::Error;

/// Failure to parse or evaluate a derived expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected token {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier `{0}` (expressions may read props, state, workspace, app)")]
    UnknownIdentifier(String),

    #[error("expression nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// Failure to resolve a binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("derived expression `{expr}` failed: {source}")]
    Derived {
        expr: String,
        #[source]
        source: ExprError,
    },
}

/// Failure reported by the API client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("{operation} on `{entity}` requires an `id` input")]
    MissingId { entity: String, operation: String },
}

impl ApiError {
    /// HTTP status, when the failure came from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure in a persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure to load configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure to export devtools records.
#[derive(Debug, Error)]
#[error("could not encode devtools records: {0}")]
pub struct ExportError(#[from] pub rmp_serde::encode::Error);
