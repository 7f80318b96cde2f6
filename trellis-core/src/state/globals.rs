//! Process-wide signals.
//!
//! The loading flag, the last error, the notification queue and the current
//! route are not tied to any entity or scope, so they are exposed through
//! dedicated accessors instead of scope/path lookup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::reactive::{Runtime, Signal};

/// Visual weight of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// One entry of the toast queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u64,
}

/// Global signals shared by every view and action.
#[derive(Clone)]
pub struct Globals {
    loading: Signal<bool>,
    error: Signal<Option<String>>,
    notifications: Signal<Vec<Notification>>,
    route: Signal<String>,
    next_notification: Arc<AtomicU64>,
}

impl Globals {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            loading: Signal::new(runtime, false),
            error: Signal::new(runtime, None),
            notifications: Signal::new(runtime, Vec::new()),
            route: Signal::new(runtime, "/".to_string()),
            next_notification: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Whether a fetch effect is in flight.
    pub fn loading(&self) -> &Signal<bool> {
        &self.loading
    }

    /// Message of the last failed fetch, `None` once cleared.
    pub fn error(&self) -> &Signal<Option<String>> {
        &self.error
    }

    pub fn notifications(&self) -> &Signal<Vec<Notification>> {
        &self.notifications
    }

    /// URL of the last navigation.
    pub fn route(&self) -> &Signal<String> {
        &self.route
    }

    /// Queue a toast and return its id.
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>, duration_ms: u64) -> u64 {
        let id = self.next_notification.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            kind,
            message: message.into(),
            duration_ms,
        };
        self.notifications.update(|queue| {
            let mut queue = queue.clone();
            queue.push(notification);
            queue
        });
        id
    }

    /// Remove a toast from the queue.
    pub fn dismiss(&self, id: u64) {
        self.notifications.update(|queue| {
            queue.iter().filter(|n| n.id != id).cloned().collect()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_and_dismiss() {
        let runtime = Runtime::new();
        let globals = Globals::new(&runtime);

        let first = globals.notify(NotificationKind::Info, "saved", 3000);
        let second = globals.notify(NotificationKind::Error, "failed", 3000);
        assert_ne!(first, second);
        assert_eq!(globals.notifications().get().len(), 2);

        globals.dismiss(first);
        let remaining = globals.notifications().get();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "failed");
    }

    #[test]
    fn defaults() {
        let runtime = Runtime::new();
        let globals = Globals::new(&runtime);
        assert!(!globals.loading().get());
        assert_eq!(globals.error().get(), None);
        assert_eq!(globals.route().get(), "/");
    }
}
