//! The node façade.
//!
//! Owns the store connection, the identity, and the channel table behind a
//! single async mutex — the one critical section every protocol handler and
//! user action passes through, which keeps the engine "as if serialized"
//! even on a multi-threaded runtime. Inbound transport events are pulled by
//! one dispatch task; a second task beacons presence. The vouch → approval
//! → key-exchange back-edge is closed here rather than inside the trust
//! path: the vouch protocol reports an approval and the façade answers with
//! a unicast carrying the group key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ordernet_db::queries::{join_requests, messages as message_queries, peers as peer_queries};
use ordernet_crypto::{aead, fingerprint};
use ordernet_types::channel::ChannelState;
use ordernet_types::events::NodeEvent;
use ordernet_types::identity::{Identity, PeerInfo};
use ordernet_types::message::{ChatBody, PlainMessage};
use ordernet_types::trust::{JoinRequest, JoinRequestStatus};
use ordernet_types::PRESENCE_INTERVAL_SECS;
use ordernet_transport::{topics, TransportEvent, TransportHandle};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channels::{ChannelManager, ChannelOptions};
use crate::config::NodeConfig;
use crate::events::EventBus;
use crate::identity::IdentityManager;
use crate::invite;
use crate::protocols::chat::ChatProtocol;
use crate::protocols::keyex::KeyExchangeProtocol;
use crate::protocols::presence::{OnlinePeer, OnlinePeers, PresenceProtocol};
use crate::protocols::vouch::{VouchApproval, VouchProtocol};
use crate::{now_ms, trust, NodeError, Result};

/// Everything mutable in the node, guarded by one mutex.
pub struct NodeState {
    /// The store connection; `None` once the node has stopped.
    pub conn: Option<rusqlite::Connection>,
    pub identity: IdentityManager,
    pub channels: ChannelManager,
    pub online_peers: OnlinePeers,
}

/// The single critical section shared by the façade and the protocols.
pub type SharedState = Arc<Mutex<NodeState>>;

struct NodeInner {
    state: SharedState,
    transport: TransportHandle,
    events: EventBus,
    chat: ChatProtocol,
    presence: PresenceProtocol,
    vouch: VouchProtocol,
    keyex: KeyExchangeProtocol,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// An OrderNet node: one identity, one store, four protocols.
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Open the store, unlock or create the identity, repopulate channels,
    /// subscribe to their topics, and start the dispatch and presence
    /// tasks.
    pub async fn start(
        config: NodeConfig,
        transport: TransportHandle,
        incoming: mpsc::Receiver<TransportEvent>,
    ) -> Result<Node> {
        let db_path = config.db_path();
        config
            .ensure_db_dir()
            .map_err(|e| NodeError::Storage(format!("cannot create data directory: {e}")))?;
        let conn = ordernet_db::open(&db_path)?;

        let identity = IdentityManager::load_or_create(
            &conn,
            config.passphrase(),
            config.nickname.as_deref().unwrap_or("anonymous"),
            now_ms(),
        )?;
        let channels = ChannelManager::load(&conn, identity.public_key())?;
        let channel_ids = channels.ids();
        info!(
            fingerprint = %identity.fingerprint(),
            channels = channel_ids.len(),
            "node starting"
        );

        let state: SharedState = Arc::new(Mutex::new(NodeState {
            conn: Some(conn),
            identity,
            channels,
            online_peers: HashMap::new(),
        }));
        let events = EventBus::new(256);

        let chat = ChatProtocol::new(state.clone(), transport.clone(), events.clone());
        let presence = PresenceProtocol::new(state.clone(), transport.clone(), events.clone());
        let vouch = VouchProtocol::new(state.clone(), transport.clone(), events.clone());
        let keyex = KeyExchangeProtocol::new(state.clone(), transport.clone(), events.clone());

        let (shutdown, _) = watch::channel(false);
        let inner = Arc::new(NodeInner {
            state,
            transport,
            events,
            chat,
            presence,
            vouch,
            keyex,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        });

        inner.transport.subscribe(topics::PRESENCE_TOPIC).await?;
        for id in &channel_ids {
            inner.transport.subscribe(&topics::chat_topic(id)).await?;
        }

        let dispatch = tokio::spawn(run_dispatch(
            inner.clone(),
            incoming,
            inner.shutdown.subscribe(),
        ));
        let beacon = tokio::spawn(run_beacon(inner.clone(), inner.shutdown.subscribe()));
        inner.tasks.lock().await.extend([dispatch, beacon]);

        Ok(Node { inner })
    }

    /// Subscribe to the event stream.
    pub fn events(&self) -> broadcast::Receiver<NodeEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the local identity.
    pub async fn identity(&self) -> Identity {
        self.inner.state.lock().await.identity.identity()
    }

    /// Short fingerprint of the local public key.
    pub async fn fingerprint(&self) -> String {
        self.inner.state.lock().await.identity.fingerprint()
    }

    /// Change the nickname, in memory and in the store.
    pub async fn set_nickname(&self, nickname: &str) -> Result<()> {
        let mut guard = self.inner.state.lock().await;
        let st = &mut *guard;
        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        st.identity.set_nickname(conn, nickname)
    }

    /// Create (or return) a public channel and subscribe to its topic.
    pub async fn create_channel(
        &self,
        name: &str,
        threshold: Option<u32>,
    ) -> Result<ChannelState> {
        let state = {
            let mut guard = self.inner.state.lock().await;
            let st = &mut *guard;
            let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
            st.channels
                .create_channel(conn, name, threshold, ChannelOptions::default())?
        };
        self.subscribe_channel(&state.config.id).await?;
        Ok(state)
    }

    /// Create an invite-only private channel with an allowlist.
    pub async fn create_private_channel(
        &self,
        name: &str,
        allowed_hexes: &[String],
        threshold: Option<u32>,
    ) -> Result<ChannelState> {
        let state = {
            let mut guard = self.inner.state.lock().await;
            let st = &mut *guard;
            let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
            st.channels
                .create_private_channel(conn, name, allowed_hexes, threshold)?
        };
        self.subscribe_channel(&state.config.id).await?;
        Ok(state)
    }

    /// Send a direct message, creating the DM channel on first use and
    /// delivering its key to the peer.
    pub async fn send_dm(&self, peer_hex: &str, content: &str) -> Result<Option<PlainMessage>> {
        let peer_pub = fingerprint::decode_key(&peer_hex.to_lowercase())?;
        let (channel_id, newly_created) = {
            let mut guard = self.inner.state.lock().await;
            let st = &mut *guard;
            let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
            let id = ordernet_types::channel::dm_channel_id(
                st.channels.self_hex(),
                &peer_hex.to_lowercase(),
            );
            let newly_created = st.channels.get(&id).is_none();
            if newly_created {
                st.channels.create_dm_channel(conn, peer_hex)?;
            }
            (id, newly_created)
        };

        if newly_created {
            self.subscribe_channel(&channel_id).await?;
            let peer_addr = self.transport_address_of(&hex::encode(peer_pub)).await;
            self.inner
                .keyex
                .send_group_key(&peer_addr, &peer_pub, &channel_id)
                .await?;
        }
        self.inner.chat.send(&channel_id, content).await
    }

    /// Send a chat message. `None` means the send was refused and an error
    /// event was emitted.
    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Option<PlainMessage>> {
        self.inner.chat.send(channel_id, content).await
    }

    /// Leave a channel: drop state, durable rows, and the subscription.
    pub async fn leave_channel(&self, channel_id: &str) -> Result<()> {
        let existed = {
            let mut guard = self.inner.state.lock().await;
            let st = &mut *guard;
            let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
            st.channels.leave_channel(conn, channel_id)?
        };
        if existed {
            self.inner
                .transport
                .unsubscribe(&topics::chat_topic(channel_id))
                .await?;
        }
        Ok(())
    }

    /// Add a peer to a channel's allowlist.
    pub async fn invite_member(&self, channel_id: &str, peer_hex: &str) -> Result<()> {
        let mut guard = self.inner.state.lock().await;
        let st = &mut *guard;
        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        st.channels.invite_member(conn, channel_id, peer_hex)
    }

    /// Portable invite code for a channel.
    pub async fn invite_code(&self, channel_id: &str) -> Result<String> {
        let guard = self.inner.state.lock().await;
        let state = guard
            .channels
            .get(channel_id)
            .ok_or_else(|| NodeError::UnknownChannel(channel_id.to_string()))?;
        invite::encode_invite_code(state)
    }

    /// Consume an invite code. `None` for any invalid code; otherwise the
    /// joined channel id.
    pub async fn accept_invite(&self, code: &str) -> Result<Option<String>> {
        let Some((config, group_key)) = invite::parse_invite_code(code) else {
            return Ok(None);
        };
        let channel_id = config.id.clone();
        {
            let mut guard = self.inner.state.lock().await;
            let st = &mut *guard;
            let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
            st.channels.join_channel(conn, config, group_key)?;
        }
        self.subscribe_channel(&channel_id).await?;
        Ok(Some(channel_id))
    }

    /// Ask a channel member to sponsor us into a channel.
    pub async fn request_join(&self, peer: &str, channel_id: &str) -> Result<()> {
        self.inner.vouch.send_join_request(peer, channel_id).await
    }

    /// Vouch for a peer on a channel, sending the vouch to the aggregating
    /// member at transport address `peer`.
    pub async fn vouch_for(&self, peer: &str, vouchee_hex: &str, channel_id: &str) -> Result<()> {
        self.inner.vouch.send_vouch(peer, vouchee_hex, channel_id).await
    }

    /// Decrypted history of a channel, oldest first. Rows that fail to
    /// decrypt (rotated or foreign keys) are skipped.
    pub async fn channel_history(
        &self,
        channel_id: &str,
        limit: u32,
    ) -> Result<Vec<PlainMessage>> {
        let guard = self.inner.state.lock().await;
        let st = &*guard;
        let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
        let channel = st
            .channels
            .get(channel_id)
            .ok_or_else(|| NodeError::UnknownChannel(channel_id.to_string()))?;

        let mut history = Vec::new();
        for row in message_queries::history(conn, channel_id, limit)? {
            let Ok(nonce) = <[u8; aead::NONCE_SIZE]>::try_from(row.nonce.as_slice()) else {
                continue;
            };
            let Ok(plaintext) = aead::decrypt_no_aad(&channel.group_key, &nonce, &row.ciphertext)
            else {
                continue;
            };
            let Ok(body) = ChatBody::from_plaintext(&plaintext) else {
                continue;
            };
            history.push(PlainMessage {
                channel_id: row.channel_id,
                message_id: row.message_id,
                content: body.content,
                sender_nick: body.sender_nick,
                sender: hex::encode(row.sender_pub_key),
                timestamp: row.timestamp,
            });
        }
        Ok(history)
    }

    /// Snapshot of all joined channels.
    pub async fn channels(&self) -> Vec<ChannelState> {
        self.inner.state.lock().await.channels.list()
    }

    /// Online peers, pruned against the TTL. Emits `peer-left` for every
    /// entry pruned by this call.
    pub async fn online_peers(&self) -> Result<Vec<(String, OnlinePeer)>> {
        self.inner.presence.get_online_peers().await
    }

    /// All peers ever observed, from the store.
    pub async fn known_peers(&self) -> Result<Vec<PeerInfo>> {
        let guard = self.inner.state.lock().await;
        let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
        let mut peers = Vec::new();
        for row in peer_queries::list(conn)? {
            let Ok(public_key) = <[u8; 32]>::try_from(row.public_key.as_slice()) else {
                continue;
            };
            let multiaddrs: Vec<String> = serde_json::from_str(&row.multiaddrs).unwrap_or_default();
            peers.push(PeerInfo {
                public_key,
                nickname: row.nickname,
                first_seen: row.first_seen,
                last_seen: row.last_seen,
                multiaddrs,
            });
        }
        Ok(peers)
    }

    /// Record a dialable address for a peer, as reported by the transport
    /// collaborator.
    pub async fn record_peer_address(&self, peer_hex: &str, addr: &str) -> Result<()> {
        let peer_pub = fingerprint::decode_key(&peer_hex.to_lowercase())?;
        let guard = self.inner.state.lock().await;
        let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
        peer_queries::add_address(conn, &peer_pub, addr)?;
        Ok(())
    }

    /// Vouch edges of a channel as hex pairs, voucher first.
    pub async fn trust_graph(&self, channel_id: &str) -> Result<Vec<(String, String)>> {
        let guard = self.inner.state.lock().await;
        let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
        trust::trust_graph(conn, channel_id)
    }

    /// Join requests recorded for a channel.
    pub async fn join_requests(&self, channel_id: &str) -> Result<Vec<JoinRequest>> {
        let guard = self.inner.state.lock().await;
        let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
        let mut requests = Vec::new();
        for row in join_requests::list_for_channel(conn, channel_id)? {
            let Ok(requester_pub_key) = <[u8; 32]>::try_from(row.requester_pub_key.as_slice())
            else {
                continue;
            };
            requests.push(JoinRequest {
                requester_pub_key,
                channel_id: row.channel_id,
                timestamp: row.timestamp,
                vouches_received: row.vouches_received,
                status: JoinRequestStatus::parse(&row.status),
            });
        }
        Ok(requests)
    }

    /// Publish one presence announcement outside the regular beacon.
    pub async fn announce_presence(&self) -> Result<()> {
        self.inner.presence.announce().await
    }

    /// Stop the node: halt the beacon and dispatch tasks, unsubscribe from
    /// topics, and close the store. Idempotent and safe from a signal
    /// handler.
    pub async fn stop(&self) {
        let _ = self.inner.shutdown.send(true);

        let tasks: Vec<JoinHandle<()>> = self.inner.tasks.lock().await.drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        let channel_ids = {
            let mut guard = self.inner.state.lock().await;
            guard.conn.take();
            guard.channels.ids()
        };
        for id in channel_ids {
            let _ = self.inner.transport.unsubscribe(&topics::chat_topic(&id)).await;
        }
        let _ = self.inner.transport.unsubscribe(topics::PRESENCE_TOPIC).await;
        info!("node stopped");
    }

    async fn subscribe_channel(&self, channel_id: &str) -> Result<()> {
        self.inner
            .transport
            .subscribe(&topics::chat_topic(channel_id))
            .await?;
        Ok(())
    }

    /// The transport address for a peer: its presence-advertised id when
    /// online, otherwise the hex key itself as an opaque address.
    async fn transport_address_of(&self, peer_hex: &str) -> String {
        self.inner
            .state
            .lock()
            .await
            .online_peers
            .get(peer_hex)
            .map(|peer| peer.peer_id.clone())
            .unwrap_or_else(|| peer_hex.to_string())
    }
}

/// Pull inbound transport events until shutdown. Handler failures become
/// error events; the loop keeps running.
async fn run_dispatch(
    inner: Arc<NodeInner>,
    mut incoming: mpsc::Receiver<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = incoming.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = dispatch_event(&inner, event).await {
                    warn!("protocol handler failed: {e}");
                    inner.events.emit(NodeEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

async fn dispatch_event(inner: &Arc<NodeInner>, event: TransportEvent) -> Result<()> {
    match event {
        TransportEvent::Gossip {
            topic,
            source,
            payload,
        } => {
            if topic == topics::PRESENCE_TOPIC {
                inner.presence.receive(&source, &payload).await
            } else if topic.starts_with(topics::CHAT_TOPIC_PREFIX) {
                inner.chat.receive(&topic, &payload).await
            } else {
                Ok(())
            }
        }
        TransportEvent::Request {
            protocol,
            peer: _,
            payload,
        } => match protocol.as_str() {
            topics::VOUCH_PROTOCOL_ID => {
                if let Some(approval) = inner.vouch.receive(&payload).await? {
                    deliver_group_key(inner, approval).await?;
                }
                Ok(())
            }
            topics::KEYEX_PROTOCOL_ID => inner.keyex.receive(&payload).await,
            _ => Ok(()),
        },
    }
}

/// The approval back-edge: answer a crossed threshold with a key-exchange
/// unicast to the vouchee.
async fn deliver_group_key(inner: &Arc<NodeInner>, approval: VouchApproval) -> Result<()> {
    let vouchee_hex = hex::encode(approval.vouchee_pub);
    let peer = inner
        .state
        .lock()
        .await
        .online_peers
        .get(&vouchee_hex)
        .map(|peer| peer.peer_id.clone())
        .unwrap_or_else(|| vouchee_hex.clone());
    inner
        .keyex
        .send_group_key(&peer, &approval.vouchee_pub, &approval.channel_id)
        .await
}

/// Announce presence every interval until shutdown.
async fn run_beacon(inner: Arc<NodeInner>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(PRESENCE_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                if let Err(e) = inner.presence.announce().await {
                    warn!("presence announcement failed: {e}");
                    inner.events.emit(NodeEvent::Error {
                        message: format!("presence announcement failed: {e}"),
                    });
                }
            }
        }
    }
}
