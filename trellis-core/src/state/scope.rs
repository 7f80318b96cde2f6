//! State scopes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four state namespaces.
///
/// Scopes differ in lifetime and sharing. `Local` is component-private by
/// convention, `Workspace` is shared by the views of one workspace, `App` is
/// application-wide, and `Session` survives reloads (always persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateScope {
    Local,
    Workspace,
    App,
    Session,
}

impl StateScope {
    pub const ALL: [StateScope; 4] = [
        StateScope::Local,
        StateScope::Workspace,
        StateScope::App,
        StateScope::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateScope::Local => "local",
            StateScope::Workspace => "workspace",
            StateScope::App => "app",
            StateScope::Session => "session",
        }
    }

    /// Whether entries in this scope persist even without an explicit flag.
    pub fn always_persists(&self) -> bool {
        matches!(self, StateScope::Session)
    }

    /// Storage key for an entry: `<scope>_<key>`.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}_{}", self.as_str(), key)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            StateScope::Local => 0,
            StateScope::Workspace => 1,
            StateScope::App => 2,
            StateScope::Session => 3,
        }
    }
}

impl fmt::Display for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown scope name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state scope `{0}`")]
pub struct UnknownScope(pub String);

impl FromStr for StateScope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StateScope::Local),
            "workspace" => Ok(StateScope::Workspace),
            "app" => Ok(StateScope::App),
            "session" => Ok(StateScope::Session),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

/// A path qualified with its scope, e.g. `workspace.tasks.0.title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPath {
    pub scope: StateScope,
    pub path: String,
}

impl ScopedPath {
    /// Parse `scope.rest`. A path whose first segment is not a scope name is
    /// taken whole in `default_scope`.
    pub fn parse(input: &str, default_scope: StateScope) -> Self {
        if let Some((head, rest)) = input.split_once('.') {
            if let Ok(scope) = head.parse() {
                return Self {
                    scope,
                    path: rest.to_string(),
                };
            }
        }
        Self {
            scope: default_scope,
            path: input.to_string(),
        }
    }
}
