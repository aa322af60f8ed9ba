//! Event bus.
//!
//! One broadcast channel of [`NodeEvent`]; subscribers that lag past the
//! buffer lose oldest events first, which is acceptable for a best-effort
//! sink.

use ordernet_types::events::NodeEvent;
use tokio::sync::broadcast;

/// Broadcasts node events to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event. Nobody listening is fine.
    pub fn emit(&self, event: NodeEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(NodeEvent::ChannelJoined {
            channel_id: "general".into(),
        });

        let event = rx.try_recv().expect("receive");
        assert_eq!(
            event,
            NodeEvent::ChannelJoined {
                channel_id: "general".into()
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        bus.emit(NodeEvent::PeerLeft { pub_key: "aa".into() });
    }

    #[test]
    fn test_subscribers_see_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.emit(NodeEvent::PeerLeft { pub_key: "1".into() });
        bus.emit(NodeEvent::PeerLeft { pub_key: "2".into() });

        assert_eq!(rx.try_recv().expect("first"), NodeEvent::PeerLeft { pub_key: "1".into() });
        assert_eq!(rx.try_recv().expect("second"), NodeEvent::PeerLeft { pub_key: "2".into() });
    }
}
