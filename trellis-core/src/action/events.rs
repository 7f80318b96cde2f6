//! Host events.
//!
//! The embedding application subscribes to learn about navigations and
//! delete requests. Sending never blocks and never fails the sender: with no
//! subscribers the event is simply dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    /// A navigate effect ran. `url` has its placeholders substituted.
    Navigate { url: String, params: Map<String, Value> },
    /// A view asked for an entity to be removed.
    DeleteRequest { entity: String, id: Value },
}

/// Broadcast channel for [`HostEvent`]s.
#[derive(Debug, Clone)]
pub struct HostEvents {
    sender: broadcast::Sender<HostEvent>,
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    /// Send to current subscribers. Returns how many received it.
    pub fn emit(&self, event: HostEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(?event, "host event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let events = HostEvents::new();
        let mut rx = events.subscribe();

        let delivered = events.emit(HostEvent::DeleteRequest {
            entity: "tasks".into(),
            id: json!(3),
        });
        assert_eq!(delivered, 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            HostEvent::DeleteRequest {
                entity: "tasks".into(),
                id: json!(3)
            }
        );
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let events = HostEvents::new();
        assert_eq!(
            events.emit(HostEvent::Navigate {
                url: "/".into(),
                params: Map::new()
            }),
            0
        );
    }
}
