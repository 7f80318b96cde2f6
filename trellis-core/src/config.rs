//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! is a valid configuration.
//!
//! ```json
//! {
//!   "apiBase": "/api",
//!   "storageDir": "/home/me/.local/share/app",
//!   "toastDurationMs": 4000,
//!   "fetchFencing": "latest_per_action",
//!   "devtools": {"enabled": true, "networkCapacity": 100, "actionCapacity": 50}
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens to a fetch response that arrives after a newer fetch of the
/// same action was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFencing {
    /// Every response is applied; the last one to resolve wins.
    #[default]
    None,
    /// Only the most recently started fetch of each action applies its
    /// result; older responses are dropped.
    LatestPerAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevtoolsConfig {
    pub enabled: bool,
    pub network_capacity: usize,
    pub action_capacity: usize,
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network_capacity: 100,
            action_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Prefix for API request paths.
    pub api_base: String,
    /// Profile directory for file-backed persistence; in-memory when unset.
    pub storage_dir: Option<PathBuf>,
    pub toast_duration_ms: u64,
    pub fetch_fencing: FetchFencing,
    pub devtools: DevtoolsConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base: "/api".to_string(),
            storage_dir: None,
            toast_duration_ms: 4000,
            fetch_fencing: FetchFencing::None,
            devtools: DevtoolsConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
