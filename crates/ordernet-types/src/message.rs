//! Chat message envelopes.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::PubKeyBytes;

/// The on-wire and at-rest form of a chat message.
///
/// The signature covers the ciphertext bytes only; `timestamp` and
/// `messageId` are advisory, and `channelId` is additionally cross-checked
/// against the pub/sub topic on receive.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    pub nonce: [u8; 24],
    pub ciphertext: Vec<u8>,
    pub sender_pub_key: PubKeyBytes,
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: [u8; 64],
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub channel_id: String,
    /// Hex of 16 random bytes; globally unique with overwhelming probability.
    pub message_id: String,
}

/// The encrypted interior of a chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub content: String,
    pub sender_nick: String,
}

/// A decrypted message as handed to consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainMessage {
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
    pub sender_nick: String,
    /// Lowercase hex of the sender's public key.
    pub sender: String,
    pub timestamp: u64,
}

impl EncryptedMessage {
    /// Canonical wire encoding.
    pub fn to_wire(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse the wire encoding.
    pub fn from_wire(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl ChatBody {
    /// Canonical plaintext encoding, the input to AEAD encryption.
    pub fn to_plaintext(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse decrypted plaintext.
    pub fn from_plaintext(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedMessage {
        EncryptedMessage {
            nonce: [7u8; 24],
            ciphertext: vec![1, 2, 3, 4],
            sender_pub_key: [9u8; 32],
            signature: [5u8; 64],
            timestamp: 1_700_000_000_000,
            channel_id: "general".into(),
            message_id: "aa".repeat(16),
        }
    }

    #[test]
    fn test_wire_roundtrip_is_exact() {
        let msg = sample();
        let wire = msg.to_wire().expect("serialize");
        let back = EncryptedMessage::from_wire(&wire).expect("parse");
        assert_eq!(back, msg);
        // Two passes produce identical bytes.
        assert_eq!(back.to_wire().expect("serialize"), wire);
    }

    #[test]
    fn test_wire_field_names_and_byte_arrays() {
        let wire = sample().to_wire().expect("serialize");
        let value: serde_json::Value = serde_json::from_slice(&wire).expect("json");
        for field in [
            "nonce",
            "ciphertext",
            "senderPubKey",
            "signature",
            "timestamp",
            "channelId",
            "messageId",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert!(value["signature"].is_array());
        assert_eq!(value["signature"].as_array().map(Vec::len), Some(64));
        assert_eq!(value["nonce"][0], serde_json::json!(7));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&sample().to_wire().expect("serialize")).expect("json");
        value.as_object_mut().expect("object").remove("signature");
        let bytes = serde_json::to_vec(&value).expect("serialize");
        assert!(EncryptedMessage::from_wire(&bytes).is_err());
    }

    #[test]
    fn test_chat_body_roundtrip() {
        let body = ChatBody {
            content: "hi".into(),
            sender_nick: "alice".into(),
        };
        let bytes = body.to_plaintext().expect("serialize");
        assert_eq!(
            ChatBody::from_plaintext(&bytes).expect("parse"),
            body
        );
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert!(value.get("senderNick").is_some());
    }
}
