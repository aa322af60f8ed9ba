//! Vouches and join requests.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::PubKeyBytes;

/// A signed attestation that `voucher` vouches for `vouchee` on a channel.
///
/// One vouch exists per (voucher, vouchee, channel); the signature covers
/// the canonical JSON of [`VouchSignable`].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vouch {
    pub voucher_pub_key: PubKeyBytes,
    pub vouchee_pub_key: PubKeyBytes,
    pub channel_id: String,
    pub timestamp: u64,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
}

/// The signed portion of a vouch, in signing order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VouchSignable<'a> {
    pub voucher_pub_key: &'a PubKeyBytes,
    pub vouchee_pub_key: &'a PubKeyBytes,
    pub channel_id: &'a str,
    pub timestamp: u64,
}

impl Vouch {
    /// Canonical bytes the signature covers.
    pub fn signable_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&VouchSignable {
            voucher_pub_key: &self.voucher_pub_key,
            vouchee_pub_key: &self.vouchee_pub_key,
            channel_id: &self.channel_id,
            timestamp: self.timestamp,
        })
    }
}

/// Lifecycle of a join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl JoinRequestStatus {
    /// Store representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Approved => "approved",
            JoinRequestStatus::Denied => "denied",
        }
    }

    /// Parse the store representation; unknown strings read as pending.
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => JoinRequestStatus::Approved,
            "denied" => JoinRequestStatus::Denied,
            _ => JoinRequestStatus::Pending,
        }
    }
}

/// A record that `requester` wants access to a channel. One per
/// (requester, channel); `vouches_received` is recomputed from the vouch
/// table whenever a vouch is saved.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub requester_pub_key: PubKeyBytes,
    pub channel_id: String,
    pub timestamp: u64,
    pub vouches_received: u32,
    pub status: JoinRequestStatus,
}
