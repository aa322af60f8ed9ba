//! In-process transport backend.
//!
//! `MemoryHub` routes commands between endpoints attached in the same
//! process: topic publishes fan out to every subscriber except the
//! publisher, unicasts go to the addressed endpoint. Integration tests and
//! the demo binary run entire multi-node topologies on one hub.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::{TransportCommand, TransportEvent, TransportHandle};

/// Queue depth per attached endpoint.
const QUEUE_DEPTH: usize = 256;

#[derive(Default)]
struct HubState {
    /// Event queue of each attached endpoint.
    endpoints: HashMap<String, mpsc::Sender<TransportEvent>>,
    /// Peer ids subscribed per topic.
    subscriptions: HashMap<String, HashSet<String>>,
}

/// An in-process transport hub.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an endpoint under an opaque peer id.
    ///
    /// Returns the node-facing handle and the inbound event queue. Dropping
    /// the handle detaches the endpoint and clears its subscriptions.
    pub async fn attach(&self, peer_id: &str) -> (TransportHandle, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel(QUEUE_DEPTH);
        let (command_tx, command_rx) = mpsc::channel(QUEUE_DEPTH);

        self.state
            .lock()
            .await
            .endpoints
            .insert(peer_id.to_string(), event_tx);

        tokio::spawn(route(self.state.clone(), peer_id.to_string(), command_rx));

        (TransportHandle::new(peer_id.to_string(), command_tx), event_rx)
    }
}

/// Per-endpoint command loop.
async fn route(
    state: Arc<Mutex<HubState>>,
    peer_id: String,
    mut commands: mpsc::Receiver<TransportCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            TransportCommand::Subscribe { topic } => {
                state
                    .lock()
                    .await
                    .subscriptions
                    .entry(topic)
                    .or_default()
                    .insert(peer_id.clone());
            }
            TransportCommand::Unsubscribe { topic } => {
                let mut st = state.lock().await;
                if let Some(subs) = st.subscriptions.get_mut(&topic) {
                    subs.remove(&peer_id);
                }
            }
            TransportCommand::Publish { topic, payload } => {
                let targets: Vec<mpsc::Sender<TransportEvent>> = {
                    let st = state.lock().await;
                    st.subscriptions
                        .get(&topic)
                        .map(|subs| {
                            subs.iter()
                                .filter(|p| *p != &peer_id)
                                .filter_map(|p| st.endpoints.get(p).cloned())
                                .collect()
                        })
                        .unwrap_or_default()
                };
                for target in targets {
                    let event = TransportEvent::Gossip {
                        topic: topic.clone(),
                        source: peer_id.clone(),
                        payload: payload.clone(),
                    };
                    if target.send(event).await.is_err() {
                        tracing::trace!("dropping gossip to detached endpoint");
                    }
                }
            }
            TransportCommand::Unicast {
                peer,
                protocol,
                payload,
            } => {
                let target = state.lock().await.endpoints.get(&peer).cloned();
                let Some(target) = target else {
                    tracing::debug!(peer = %peer, "unicast to unknown peer dropped");
                    continue;
                };
                let event = TransportEvent::Request {
                    protocol,
                    peer: peer_id.clone(),
                    payload,
                };
                if target.send(event).await.is_err() {
                    tracing::trace!("dropping unicast to detached endpoint");
                }
            }
        }
    }

    // Command sender dropped: detach.
    let mut st = state.lock().await;
    st.endpoints.remove(&peer_id);
    for subs in st.subscriptions.values_mut() {
        subs.remove(&peer_id);
    }
}
