//! Presence.
//!
//! Periodic signed announcements on a well-known topic keep an online-peer
//! table, pruned lazily against the TTL when the table is read.

use std::collections::HashMap;

use ordernet_crypto::ed25519::{Signature, VerifyingKey};
use ordernet_db::queries::peers as peer_queries;
use ordernet_types::events::NodeEvent;
use ordernet_types::wire::PresenceAnnouncement;
use ordernet_types::PEER_TTL_MS;
use ordernet_transport::{topics, TransportHandle};

use crate::events::EventBus;
use crate::node::SharedState;
use crate::{now_ms, NodeError, Result};

/// A currently-online peer, keyed by hex public key in the node state.
#[derive(Debug, Clone)]
pub struct OnlinePeer {
    pub nickname: String,
    /// Timestamp of the newest accepted announcement. Never moves backwards.
    pub last_seen: u64,
    /// Opaque transport id the announcement arrived from; used to address
    /// unicasts back to this peer.
    pub peer_id: String,
    /// Channels the peer advertised.
    pub channels: Vec<String>,
}

/// The online-peer table, pruned.
pub type OnlinePeers = HashMap<String, OnlinePeer>;

pub struct PresenceProtocol {
    state: SharedState,
    transport: TransportHandle,
    events: EventBus,
}

impl PresenceProtocol {
    pub fn new(state: SharedState, transport: TransportHandle, events: EventBus) -> Self {
        Self {
            state,
            transport,
            events,
        }
    }

    /// Sign and publish one presence announcement.
    pub async fn announce(&self) -> Result<()> {
        let guard = self.state.lock().await;
        let st = &*guard;

        let mut announcement = PresenceAnnouncement {
            pub_key: st.identity.public_key(),
            nickname: st.identity.nickname().to_string(),
            timestamp: now_ms(),
            channels: st.channels.ids(),
            signature: [0u8; 64],
        };
        announcement.signature = st
            .identity
            .signing_key()
            .sign(&announcement.signable_bytes()?)
            .to_bytes();
        let wire = announcement.to_wire()?;
        drop(guard);

        self.transport.publish(topics::PRESENCE_TOPIC, wire).await?;
        Ok(())
    }

    /// Handle an announcement from the presence topic.
    pub async fn receive(&self, source: &str, payload: &[u8]) -> Result<()> {
        let Ok(announcement) = PresenceAnnouncement::from_wire(payload) else {
            tracing::debug!("dropping malformed presence announcement");
            return Ok(());
        };
        let Ok(key) = VerifyingKey::from_bytes(&announcement.pub_key) else {
            tracing::debug!("dropping presence announcement with invalid key");
            return Ok(());
        };
        let Ok(signable) = announcement.signable_bytes() else {
            return Ok(());
        };
        if key
            .verify(&signable, &Signature::from_bytes(&announcement.signature))
            .is_err()
        {
            tracing::debug!("dropping presence announcement with bad signature");
            return Ok(());
        }

        let mut guard = self.state.lock().await;
        let st = &mut *guard;

        let peer_hex = hex::encode(announcement.pub_key);
        if peer_hex == st.channels.self_hex() {
            return Ok(());
        }

        // Newer timestamp wins; an out-of-order older announcement is
        // ignored entirely.
        if st
            .online_peers
            .get(&peer_hex)
            .is_some_and(|existing| existing.last_seen >= announcement.timestamp)
        {
            return Ok(());
        }
        let first_appearance = !st.online_peers.contains_key(&peer_hex);

        st.online_peers.insert(
            peer_hex.clone(),
            OnlinePeer {
                nickname: announcement.nickname.clone(),
                last_seen: announcement.timestamp,
                peer_id: source.to_string(),
                channels: announcement.channels.clone(),
            },
        );

        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        peer_queries::upsert_presence(
            conn,
            &announcement.pub_key,
            &announcement.nickname,
            announcement.timestamp,
        )?;
        drop(guard);

        if first_appearance {
            self.events.emit(NodeEvent::PeerJoined {
                pub_key: peer_hex.clone(),
                nickname: announcement.nickname.clone(),
            });
        }
        self.events.emit(NodeEvent::Presence {
            pub_key: peer_hex,
            nickname: announcement.nickname,
            channels: announcement.channels,
        });
        Ok(())
    }

    /// Prune entries past the TTL, emit `peer-left` for each, and return a
    /// snapshot of who is still online, sorted by hex key.
    pub async fn get_online_peers(&self) -> Result<Vec<(String, OnlinePeer)>> {
        let mut guard = self.state.lock().await;
        let now = now_ms();

        let expired: Vec<String> = guard
            .online_peers
            .iter()
            .filter(|(_, peer)| now.saturating_sub(peer.last_seen) > PEER_TTL_MS)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            guard.online_peers.remove(key);
        }

        let mut snapshot: Vec<(String, OnlinePeer)> = guard
            .online_peers
            .iter()
            .map(|(key, peer)| (key.clone(), peer.clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        drop(guard);

        for key in expired {
            self.events.emit(NodeEvent::PeerLeft { pub_key: key });
        }
        Ok(snapshot)
    }
}
