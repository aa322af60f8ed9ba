//! The event sum emitted by the node façade.
//!
//! One tagged enum instead of an emitter hierarchy: subscribers receive
//! every event and match on the tag.

use serde::{Deserialize, Serialize};

use crate::message::PlainMessage;

/// Everything the node reports to its consumers, in arrival order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeEvent {
    /// A chat message was accepted on a channel.
    #[serde(rename_all = "camelCase")]
    Message { message: PlainMessage },

    /// A chat message was accepted on a direct-message channel.
    #[serde(rename_all = "camelCase")]
    Dm { message: PlainMessage },

    /// A peer announced presence for the first time.
    #[serde(rename_all = "camelCase")]
    PeerJoined { pub_key: String, nickname: String },

    /// A peer's presence expired past the TTL.
    #[serde(rename_all = "camelCase")]
    PeerLeft { pub_key: String },

    /// A join request arrived over the vouch protocol.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        requester: String,
        nickname: String,
        channel_id: String,
    },

    /// A valid vouch arrived and was recorded.
    #[serde(rename_all = "camelCase")]
    VouchReceived {
        voucher: String,
        vouchee: String,
        channel_id: String,
    },

    /// A vouchee crossed the channel's threshold and was approved.
    #[serde(rename_all = "camelCase")]
    ChannelJoined { channel_id: String },

    /// A group key arrived and the channel was joined locally.
    #[serde(rename_all = "camelCase")]
    KeyReceived { channel_id: String },

    /// A presence announcement was processed (emitted per announcement).
    #[serde(rename_all = "camelCase")]
    Presence {
        pub_key: String,
        nickname: String,
        channels: Vec<String>,
    },

    /// A handler failed; the node keeps running.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}
