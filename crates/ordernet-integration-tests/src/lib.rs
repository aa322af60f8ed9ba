//! Integration test crate for the OrderNet node.
//!
//! The tests exercise end-to-end flows across multiple nodes attached to
//! one in-process transport hub: chat dissemination and access control,
//! invite codes, the vouch threshold and key-exchange chain, presence
//! pruning, and restart persistence.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p ordernet-integration-tests
//! ```

use std::time::Duration;

use ordernet_node::{Node, NodeConfig};
use ordernet_transport::memory::MemoryHub;
use ordernet_types::events::NodeEvent;
use tokio::sync::broadcast;

/// Start a node on the hub with a fresh in-memory database.
///
/// The hub peer id doubles as the node's transport address in tests.
pub async fn spawn_node(
    hub: &MemoryHub,
    peer_id: &str,
    nickname: &str,
) -> (Node, broadcast::Receiver<NodeEvent>) {
    let (transport, incoming) = hub.attach(peer_id).await;
    let config = NodeConfig {
        nickname: Some(nickname.to_string()),
        db_path: Some(":memory:".into()),
        ..NodeConfig::default()
    };
    let node = Node::start(config, transport, incoming)
        .await
        .expect("node starts");
    let events = node.events();
    (node, events)
}

/// Let in-flight hub routing settle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

/// Wait for the first event matching `pred`, failing after a few seconds.
pub async fn expect_event<F>(
    events: &mut broadcast::Receiver<NodeEvent>,
    what: &str,
    pred: F,
) -> NodeEvent
where
    F: Fn(&NodeEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event stream open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

/// Assert that no event matching `pred` arrives within a short window.
pub async fn expect_no_event<F>(events: &mut broadcast::Receiver<NodeEvent>, what: &str, pred: F)
where
    F: Fn(&NodeEvent) -> bool,
{
    let outcome = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    })
    .await;
    if let Ok(event) = outcome {
        panic!("unexpected {what}: {event:?}");
    }
}
