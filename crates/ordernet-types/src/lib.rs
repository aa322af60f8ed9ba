//! # ordernet-types
//!
//! Shared domain types for the OrderNet node: the persistent data model,
//! the canonical-JSON wire envelopes of the four peer protocols, and the
//! event sum the node façade emits.
//!
//! Wire envelopes declare their fields in wire order and rename to
//! camelCase, so `serde_json::to_vec` is the canonical deterministic
//! encoding; byte fields serialize as JSON integer arrays.

pub mod channel;
pub mod events;
pub mod identity;
pub mod message;
pub mod trust;
pub mod wire;

/// A channel group key (XChaCha20-Poly1305).
pub type GroupKey = [u8; 32];

/// Raw Ed25519 public key bytes.
pub type PubKeyBytes = [u8; 32];

/// Number of random bytes behind a message id (hex-encoded on the wire).
pub const MESSAGE_ID_BYTES: usize = 16;

/// Presence announcement interval.
pub const PRESENCE_INTERVAL_SECS: u64 = 30;

/// Online-peer TTL in milliseconds; entries older than this are pruned.
pub const PEER_TTL_MS: u64 = 120_000;

/// Default vouch threshold for newly created channels.
pub const DEFAULT_VOUCH_THRESHOLD: u32 = 2;

/// Passphrase wrapping the identity at rest when none is configured.
pub const DEFAULT_PASSPHRASE: &str = "ordernet-default";

/// Invite code format version.
pub const INVITE_CODE_VERSION: u32 = 1;
