//! Action log: what each dispatch did to the state.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::diff::{diff, Change};
use super::ring::RingBuffer;
use crate::action::{DispatchObserver, DispatchRecord};
use crate::error::ExportError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub id: u64,
    pub action: String,
    pub payload: Value,
    pub before: Value,
    pub after: Value,
    pub diff: Vec<Change>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub aborted: bool,
}

#[derive(Debug)]
pub struct ActionLog {
    entries: Mutex<RingBuffer<ActionLogEntry>>,
    next_id: AtomicU64,
}

impl ActionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(RingBuffer::new(capacity)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Logged dispatches, oldest first.
    pub fn snapshot(&self) -> Vec<ActionLogEntry> {
        self.entries.lock().to_vec()
    }

    pub fn latest(&self) -> Option<ActionLogEntry> {
        self.entries.lock().latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        Ok(rmp_serde::to_vec_named(&self.snapshot())?)
    }
}

impl DispatchObserver for ActionLog {
    fn on_dispatch(&self, record: DispatchRecord) {
        let DispatchRecord {
            action,
            payload,
            before,
            after,
            started_at,
            duration,
            aborted,
        } = record;
        let entry = ActionLogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            diff: diff(&before, &after),
            action,
            payload,
            before,
            after,
            started_at,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            aborted,
        };
        self.entries.lock().push(entry);
    }
}
