//! Local identity and observed peers.

use serde::{Deserialize, Serialize};

use crate::PubKeyBytes;

/// The node's own identity. Exactly one exists per node; the private half
/// lives encrypted in the store and in the identity manager's memory, never
/// in this record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    pub public_key: PubKeyBytes,
    pub nickname: String,
    pub created_at: u64,
}

/// An observed remote participant, keyed by its Ed25519 public key.
///
/// Created or refreshed whenever a valid presence announcement arrives.
/// `multiaddrs` holds dialable addresses the transport collaborator has
/// reported for this peer, in the order they were learned.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerInfo {
    pub public_key: PubKeyBytes,
    pub nickname: String,
    pub first_seen: u64,
    pub last_seen: u64,
    pub multiaddrs: Vec<String>,
}

impl Identity {
    /// Lowercase hex of the public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}

impl PeerInfo {
    /// Lowercase hex of the public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }
}
