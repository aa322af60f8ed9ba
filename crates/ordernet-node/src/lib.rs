//! # ordernet-node
//!
//! The OrderNet node engine: identity and key management, channel state and
//! access control, the four peer protocols (chat, presence, vouching,
//! group-key exchange), and the façade that wires them over a transport
//! seam and a SQLite store.
//!
//! The terminal and web UIs, the HTTP bridge, and the networked transport
//! engine are external consumers of [`Node`] and
//! [`ordernet_transport::TransportHandle`].

pub mod channels;
pub mod config;
pub mod events;
pub mod identity;
pub mod invite;
pub mod node;
pub mod protocols;
pub mod trust;

pub use config::NodeConfig;
pub use node::Node;

/// Error types for node operations.
///
/// Inbound protocol handlers never let these escape the node: crypto
/// failures, allowlist rejections, and malformed envelopes are local drops,
/// and everything else surfaces on the event bus as
/// [`ordernet_types::events::NodeEvent::Error`].
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Crypto(#[from] ordernet_crypto::CryptoError),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("malformed envelope")]
    MalformedEnvelope,

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Transport(#[from] ordernet_transport::TransportError),

    #[error("identity locked: the stored key does not decrypt under this passphrase")]
    IdentityLocked,

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("node stopped")]
    Stopped,
}

impl From<ordernet_db::DbError> for NodeError {
    fn from(e: ordernet_db::DbError) -> Self {
        NodeError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(_: serde_json::Error) -> Self {
        NodeError::MalformedEnvelope
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
