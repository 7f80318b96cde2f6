//! Path-level diff between two state snapshots.
//!
//! Objects are compared key by key and recursed into. Arrays and scalars are
//! leaves: a changed array is reported once at its own path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One difference, addressed by a dot-joined path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Change {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Changed { path: String, before: Value, after: Value },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. } | Change::Removed { path, .. } | Change::Changed { path, .. } => path,
        }
    }
}

pub fn diff(before: &Value, after: &Value) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_into(&mut changes, String::new(), before, after);
    changes
}

fn diff_into(changes: &mut Vec<Change>, path: String, before: &Value, after: &Value) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => diff_objects(changes, &path, a, b),
        _ if before == after => {}
        _ => changes.push(Change::Changed {
            path,
            before: before.clone(),
            after: after.clone(),
        }),
    }
}

fn diff_objects(changes: &mut Vec<Change>, prefix: &str, a: &Map<String, Value>, b: &Map<String, Value>) {
    for (key, old) in a {
        let path = join(prefix, key);
        match b.get(key) {
            Some(new) => diff_into(changes, path, old, new),
            None => changes.push(Change::Removed {
                path,
                value: old.clone(),
            }),
        }
    }
    for (key, new) in b {
        if !a.contains_key(key) {
            changes.push(Change::Added {
                path: join(prefix, key),
                value: new.clone(),
            });
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
