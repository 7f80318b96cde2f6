//! Devtools: bounded observability logs for an external inspector.
//!
//! [`NetworkLog`] records every API call made through a
//! [`RecordingApiClient`]; [`ActionLog`] observes the dispatcher and stores
//! before/after snapshots with a path-level [`diff`](diff::diff). Both are
//! ring buffers, so a long session keeps only the most recent records.

pub mod diff;
mod actions;
mod network;
mod ring;

use std::sync::Arc;

use serde::Serialize;

pub use actions::{ActionLog, ActionLogEntry};
pub use diff::Change;
pub use network::{NetworkLog, NetworkRequest, RecordingApiClient};
pub use ring::RingBuffer;

use crate::config::DevtoolsConfig;
use crate::error::ExportError;

/// Both logs, sized from configuration.
#[derive(Debug, Clone)]
pub struct Devtools {
    network: Arc<NetworkLog>,
    actions: Arc<ActionLog>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Export {
    network: Vec<NetworkRequest>,
    actions: Vec<ActionLogEntry>,
}

impl Devtools {
    pub fn new(config: &DevtoolsConfig) -> Self {
        Self {
            network: Arc::new(NetworkLog::new(config.network_capacity)),
            actions: Arc::new(ActionLog::new(config.action_capacity)),
        }
    }

    pub fn network(&self) -> &Arc<NetworkLog> {
        &self.network
    }

    pub fn actions(&self) -> &Arc<ActionLog> {
        &self.actions
    }

    /// MessagePack document `{network, actions}`.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        let export = Export {
            network: self.network.snapshot(),
            actions: self.actions.snapshot(),
        };
        Ok(rmp_serde::to_vec_named(&export)?)
    }

    pub fn clear(&self) {
        self.network.clear();
        self.actions.clear();
    }
}
