//! Chat dissemination.
//!
//! One pub/sub topic per channel. Outgoing messages are encrypted under the
//! channel group key and signed over the ciphertext; incoming messages are
//! deduplicated by message id, signature-verified, decrypted, and checked
//! against the channel allowlist before anything is emitted.

use ordernet_crypto::aead;
use ordernet_crypto::ed25519::{Signature, VerifyingKey};
use ordernet_db::queries::messages as message_queries;
use ordernet_types::channel::AccessMode;
use ordernet_types::events::NodeEvent;
use ordernet_types::message::{ChatBody, EncryptedMessage, PlainMessage};
use ordernet_types::MESSAGE_ID_BYTES;
use ordernet_transport::{topics, TransportHandle};

use crate::events::EventBus;
use crate::node::SharedState;
use crate::{now_ms, NodeError, Result};

pub struct ChatProtocol {
    state: SharedState,
    transport: TransportHandle,
    events: EventBus,
}

impl ChatProtocol {
    pub fn new(state: SharedState, transport: TransportHandle, events: EventBus) -> Self {
        Self {
            state,
            transport,
            events,
        }
    }

    /// Encrypt, sign, persist, and publish a message on a channel.
    ///
    /// Returns the plaintext form for immediate echo, or `None` after
    /// emitting an error event when the channel is unknown or the local
    /// identity is not allowed to send.
    pub async fn send(&self, channel_id: &str, content: &str) -> Result<Option<PlainMessage>> {
        let guard = self.state.lock().await;
        let st = &*guard;

        let self_hex = st.channels.self_hex().to_string();
        let Some(channel) = st.channels.get(channel_id) else {
            self.events.emit(NodeEvent::Error {
                message: format!("cannot send: unknown channel '{channel_id}'"),
            });
            return Ok(None);
        };
        if !channel.has_access(&self_hex) {
            self.events.emit(NodeEvent::Error {
                message: format!("access denied on '{channel_id}'"),
            });
            return Ok(None);
        }

        let body = ChatBody {
            content: content.to_string(),
            sender_nick: st.identity.nickname().to_string(),
        };
        let plaintext = body.to_plaintext()?;
        let nonce = aead::generate_nonce();
        let ciphertext = aead::encrypt_no_aad(&channel.group_key, &nonce, &plaintext)?;
        let signature = st.identity.signing_key().sign(&ciphertext).to_bytes();

        let envelope = EncryptedMessage {
            nonce,
            ciphertext,
            sender_pub_key: st.identity.public_key(),
            signature,
            timestamp: now_ms(),
            channel_id: channel_id.to_string(),
            message_id: random_message_id(),
        };
        let wire = envelope.to_wire()?;

        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        message_queries::insert(conn, &envelope_to_row(&envelope))?;

        self.transport
            .publish(&topics::chat_topic(channel_id), wire)
            .await?;

        Ok(Some(PlainMessage {
            channel_id: envelope.channel_id,
            message_id: envelope.message_id,
            content: body.content,
            sender_nick: body.sender_nick,
            sender: self_hex,
            timestamp: envelope.timestamp,
        }))
    }

    /// Handle a payload from a chat topic.
    ///
    /// Every rejection on this path is a silent local drop; only storage
    /// failures surface.
    pub async fn receive(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let Some(topic_channel) = topics::channel_from_topic(topic) else {
            return Ok(());
        };
        let Ok(envelope) = EncryptedMessage::from_wire(payload) else {
            tracing::debug!(topic, "dropping malformed chat envelope");
            return Ok(());
        };
        if envelope.channel_id != topic_channel {
            tracing::debug!(topic, "dropping chat envelope with mismatched channel id");
            return Ok(());
        }

        let mut guard = self.state.lock().await;
        let st = &mut *guard;
        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;

        if message_queries::exists(conn, &envelope.message_id)? {
            return Ok(());
        }
        let Some(channel) = st.channels.get(topic_channel) else {
            return Ok(());
        };
        let group_key = channel.group_key;
        let access_mode = channel.config.access_mode;

        let Ok(sender_key) = VerifyingKey::from_bytes(&envelope.sender_pub_key) else {
            tracing::debug!("dropping chat message with invalid sender key");
            return Ok(());
        };
        if sender_key
            .verify(
                &envelope.ciphertext,
                &Signature::from_bytes(&envelope.signature),
            )
            .is_err()
        {
            tracing::debug!("dropping chat message with bad signature");
            return Ok(());
        }
        let Ok(plaintext) = aead::decrypt_no_aad(&group_key, &envelope.nonce, &envelope.ciphertext)
        else {
            tracing::debug!("dropping chat message that fails decryption");
            return Ok(());
        };
        let Ok(body) = ChatBody::from_plaintext(&plaintext) else {
            tracing::debug!("dropping chat message with malformed body");
            return Ok(());
        };

        let sender_hex = hex::encode(envelope.sender_pub_key);
        if !st.channels.has_access(topic_channel, &sender_hex) {
            tracing::debug!("dropping chat message from sender outside the allowlist");
            return Ok(());
        }

        message_queries::insert(conn, &envelope_to_row(&envelope))?;
        st.channels.record_member(topic_channel, &sender_hex);

        let plain = PlainMessage {
            channel_id: envelope.channel_id,
            message_id: envelope.message_id,
            content: body.content,
            sender_nick: body.sender_nick,
            sender: sender_hex,
            timestamp: envelope.timestamp,
        };
        drop(guard);

        match access_mode {
            AccessMode::Dm => self.events.emit(NodeEvent::Dm { message: plain }),
            _ => self.events.emit(NodeEvent::Message { message: plain }),
        }
        Ok(())
    }
}

/// Hex of 16 random bytes.
fn random_message_id() -> String {
    let mut bytes = [0u8; MESSAGE_ID_BYTES];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    hex::encode(bytes)
}

fn envelope_to_row(envelope: &EncryptedMessage) -> message_queries::MessageRow {
    message_queries::MessageRow {
        message_id: envelope.message_id.clone(),
        channel_id: envelope.channel_id.clone(),
        sender_pub_key: envelope.sender_pub_key.to_vec(),
        nonce: envelope.nonce.to_vec(),
        ciphertext: envelope.ciphertext.clone(),
        signature: envelope.signature.to_vec(),
        timestamp: envelope.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_random_hex() {
        let id = random_message_id();
        assert_eq!(id.len(), MESSAGE_ID_BYTES * 2);
        assert!(hex::decode(&id).is_ok());
        assert_ne!(id, random_message_id());
    }
}
