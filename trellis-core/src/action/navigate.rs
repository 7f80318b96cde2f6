//! Navigation: route templates and history.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::api::encode_component;

/// Substitute `{name}` and `:name` placeholders in a route template.
///
/// Values are percent-encoded. Placeholders without a matching param are
/// left as written.
pub fn substitute(template: &str, params: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', ':']) {
        out.push_str(&rest[..pos]);
        let marker = &rest[pos..];

        let (name, consumed) = if let Some(braced) = marker.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let name_len = marker[1..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(marker.len() - 1);
            (&marker[1..1 + name_len], name_len + 1)
        };

        match params.get(name) {
            Some(value) if !name.is_empty() => {
                out.push_str(&encode_component(value));
                rest = &marker[consumed..];
            }
            _ => {
                // Not a placeholder we can fill; keep the marker character
                out.push_str(&marker[..1]);
                rest = &marker[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub params: Map<String, Value>,
}

/// In-memory navigation history.
///
/// Like a browser session history it is unbounded: every navigation pushes
/// and only `back` pops.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: HistoryEntry) {
        self.entries.lock().push(entry);
    }

    pub fn current(&self) -> Option<HistoryEntry> {
        self.entries.lock().last().cloned()
    }

    /// Drop the current entry and return the one before it.
    pub fn back(&self) -> Option<HistoryEntry> {
        let mut entries = self.entries.lock();
        if entries.len() < 2 {
            return None;
        }
        entries.pop();
        entries.last().cloned()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
