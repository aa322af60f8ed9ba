//! # ordernet-transport
//!
//! The seam between the OrderNet node engine and its peer-to-peer transport.
//!
//! The transport library itself (TCP, stream multiplexing, Noise, mDNS,
//! bootstrap dialing, gossip fanout) lives outside this workspace. The node
//! only assumes two primitives, expressed here as plain channel traffic:
//!
//! - topic-based publish/subscribe delivering opaque byte payloads to all
//!   subscribed peers ([`TransportCommand::Publish`] →
//!   [`TransportEvent::Gossip`])
//! - one-shot request unicast addressed by opaque peer id
//!   ([`TransportCommand::Unicast`] → [`TransportEvent::Request`])
//!
//! A backend consumes [`TransportCommand`]s from the receiver it was handed
//! at attach time and pushes [`TransportEvent`]s into the node's inbound
//! queue. [`memory::MemoryHub`] implements the contract in-process.

pub mod memory;
pub mod topics;

use tokio::sync::mpsc;

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The backend is gone; its command channel is closed.
    #[error("transport backend closed")]
    BackendClosed,

    /// Dial or publish failure reported by the backend.
    #[error("transport failure: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Outbound instructions from the node to its transport backend.
#[derive(Debug, Clone)]
pub enum TransportCommand {
    /// Join a pub/sub topic.
    Subscribe { topic: String },
    /// Leave a pub/sub topic.
    Unsubscribe { topic: String },
    /// Publish an opaque payload to all peers subscribed to `topic`.
    Publish { topic: String, payload: Vec<u8> },
    /// Deliver an opaque payload to one peer over a short stream.
    Unicast {
        peer: String,
        protocol: String,
        payload: Vec<u8>,
    },
}

/// Inbound deliveries from the transport backend to the node.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A payload published on a subscribed topic.
    Gossip {
        topic: String,
        /// Opaque id of the publishing peer.
        source: String,
        payload: Vec<u8>,
    },
    /// A one-shot unicast payload.
    Request {
        protocol: String,
        /// Opaque id of the sending peer.
        peer: String,
        payload: Vec<u8>,
    },
}

/// The node's sending half of the transport seam.
#[derive(Clone)]
pub struct TransportHandle {
    peer_id: String,
    commands: mpsc::Sender<TransportCommand>,
}

impl TransportHandle {
    /// Wrap a backend's command queue. `peer_id` is this node's opaque
    /// transport identity.
    pub fn new(peer_id: String, commands: mpsc::Sender<TransportCommand>) -> Self {
        Self { peer_id, commands }
    }

    /// This node's opaque transport peer id.
    pub fn local_peer_id(&self) -> &str {
        &self.peer_id
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.send(TransportCommand::Subscribe {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.send(TransportCommand::Unsubscribe {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.send(TransportCommand::Publish {
            topic: topic.to_string(),
            payload,
        })
        .await
    }

    pub async fn unicast(&self, peer: &str, protocol: &str, payload: Vec<u8>) -> Result<()> {
        self.send(TransportCommand::Unicast {
            peer: peer.to_string(),
            protocol: protocol.to_string(),
            payload,
        })
        .await
    }

    async fn send(&self, command: TransportCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TransportError::BackendClosed)
    }
}
