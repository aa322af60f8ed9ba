//! Group-key exchange over one-shot unicast.
//!
//! Delivers a channel's group key encrypted to one recipient. The receive
//! side reconstructs a channel config around the key: the sender becomes
//! the creator and the threshold resets to the default, since the payload
//! does not carry the inviter's full config.

use std::collections::BTreeSet;

use ordernet_types::channel::{AccessMode, ChannelConfig};
use ordernet_types::events::NodeEvent;
use ordernet_types::wire::KeyExchangePayload;
use ordernet_types::DEFAULT_VOUCH_THRESHOLD;
use ordernet_transport::{topics, TransportHandle};

use crate::events::EventBus;
use crate::node::SharedState;
use crate::{invite, now_ms, NodeError, Result};

pub struct KeyExchangeProtocol {
    state: SharedState,
    transport: TransportHandle,
    events: EventBus,
}

impl KeyExchangeProtocol {
    pub fn new(state: SharedState, transport: TransportHandle, events: EventBus) -> Self {
        Self {
            state,
            transport,
            events,
        }
    }

    /// Encrypt a channel's group key to `recipient_pub` and send it to the
    /// peer at transport address `peer`.
    pub async fn send_group_key(
        &self,
        peer: &str,
        recipient_pub: &[u8; 32],
        channel_id: &str,
    ) -> Result<()> {
        let guard = self.state.lock().await;
        let channel = guard
            .channels
            .get(channel_id)
            .ok_or_else(|| NodeError::UnknownChannel(channel_id.to_string()))?;
        let payload = invite::create_key_exchange(
            guard.identity.signing_key(),
            recipient_pub,
            channel_id,
            &channel.group_key,
            now_ms(),
        )?;
        let wire = payload.to_wire()?;
        drop(guard);

        self.transport
            .unicast(peer, topics::KEYEX_PROTOCOL_ID, wire)
            .await?;
        Ok(())
    }

    /// Handle a unicast on the key-exchange protocol.
    ///
    /// Payloads addressed to someone else, or failing signature or AEAD
    /// verification, are dropped locally.
    pub async fn receive(&self, payload: &[u8]) -> Result<()> {
        let Ok(payload) = KeyExchangePayload::from_wire(payload) else {
            tracing::debug!("dropping malformed key-exchange payload");
            return Ok(());
        };

        let mut guard = self.state.lock().await;
        let st = &mut *guard;

        if payload.recipient_pub_key != st.identity.public_key() {
            tracing::debug!("dropping key exchange addressed to another recipient");
            return Ok(());
        }

        let group_key = match invite::open_key_exchange(st.identity.signing_key(), &payload) {
            Ok(key) => key,
            Err(NodeError::Crypto(_)) => {
                tracing::debug!("dropping key exchange that fails verification");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // The payload carries no config, so one is reconstructed around the
        // key: sender as creator, default threshold. Direct-message
        // channels are recognized by their structured id and keep their
        // two-party allowlist.
        let is_dm = payload.channel_id.starts_with("dm-");
        let mut allowed_members = BTreeSet::new();
        allowed_members.insert(st.channels.self_hex().to_string());
        if is_dm {
            allowed_members.insert(hex::encode(payload.sender_pub_key));
        }
        let config = ChannelConfig {
            id: payload.channel_id.clone(),
            name: format!("#{}", payload.channel_id),
            creator_pub_key: payload.sender_pub_key,
            vouch_threshold: DEFAULT_VOUCH_THRESHOLD,
            created_at: payload.timestamp,
            access_mode: if is_dm { AccessMode::Dm } else { AccessMode::Public },
            invite_only: is_dm,
            allowed_members,
        };

        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        st.channels.join_channel(conn, config, group_key)?;
        drop(guard);

        self.transport
            .subscribe(&topics::chat_topic(&payload.channel_id))
            .await?;
        self.events.emit(NodeEvent::KeyReceived {
            channel_id: payload.channel_id,
        });
        Ok(())
    }
}
