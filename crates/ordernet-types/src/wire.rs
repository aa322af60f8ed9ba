//! Wire envelopes for the presence, vouch, and key-exchange protocols, and
//! the invite-code payload.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::channel::AccessMode;
use crate::PubKeyBytes;

/// A periodic signed presence beacon on the well-known presence topic.
///
/// The signature covers the canonical JSON of [`PresenceSignable`].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceAnnouncement {
    pub pub_key: PubKeyBytes,
    pub nickname: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Ids of channels this node is currently in.
    pub channels: Vec<String>,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

/// The signed portion of a presence announcement.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSignable<'a> {
    pub pub_key: &'a PubKeyBytes,
    pub nickname: &'a str,
    pub timestamp: u64,
    pub channels: &'a [String],
}

impl PresenceAnnouncement {
    /// Canonical bytes the signature covers.
    pub fn signable_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&PresenceSignable {
            pub_key: &self.pub_key,
            nickname: &self.nickname,
            timestamp: self.timestamp,
            channels: &self.channels,
        })
    }

    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_wire(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The two unicast message kinds of the vouch protocol, discriminated by
/// the `type` field.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VouchEnvelope {
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        requester_pub_key: PubKeyBytes,
        nickname: String,
        channel_id: String,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    Vouch {
        voucher_pub_key: PubKeyBytes,
        vouchee_pub_key: PubKeyBytes,
        channel_id: String,
        timestamp: u64,
        #[serde_as(as = "serde_with::Bytes")]
        signature: [u8; 64],
    },
}

impl VouchEnvelope {
    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_wire(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// A channel group key encrypted to one recipient, delivered by unicast.
///
/// The group key is wrapped under a key derived from an ephemeral X25519
/// exchange against the recipient's identity; the signature covers the
/// canonical JSON of [`KeyExchangeSignable`].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExchangePayload {
    pub sender_pub_key: PubKeyBytes,
    pub recipient_pub_key: PubKeyBytes,
    pub channel_id: String,
    pub encrypted_group_key: Vec<u8>,
    pub ephemeral_pub_key: [u8; 32],
    pub nonce: [u8; 24],
    pub timestamp: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

/// The signed portion of a key-exchange payload.
#[derive(Serialize)]
pub struct KeyExchangeSignable<'a> {
    pub sender: &'a PubKeyBytes,
    pub recipient: &'a PubKeyBytes,
    pub channel: &'a str,
    pub timestamp: u64,
}

impl KeyExchangePayload {
    /// Canonical bytes the signature covers.
    pub fn signable_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&KeyExchangeSignable {
            sender: &self.sender_pub_key,
            recipient: &self.recipient_pub_key,
            channel: &self.channel_id,
            timestamp: self.timestamp,
        })
    }

    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_wire(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The JSON interior of a portable invite code (base64url on the outside).
///
/// Access fields are optional so codes from minimal producers still parse;
/// they default to an open public channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodePayload {
    pub version: u32,
    pub id: String,
    pub name: String,
    pub creator_pub_key_hex: String,
    pub vouch_threshold: u32,
    #[serde(default = "default_access_mode")]
    pub access_mode: AccessMode,
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub allowed_members: BTreeSet<String>,
    pub created_at: u64,
    pub group_key_hex: String,
}

fn default_access_mode() -> AccessMode {
    AccessMode::Public
}
