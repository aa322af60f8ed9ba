//! Vouching over one-shot unicast.
//!
//! Two message kinds share the protocol id, discriminated by the envelope's
//! `type` field: a join request announcing that a peer wants into a
//! channel, and a vouch from an existing member. Crossing the channel
//! threshold is reported to the façade, which answers with a key exchange.

use ordernet_crypto::fingerprint;
use ordernet_types::events::NodeEvent;
use ordernet_types::trust::Vouch;
use ordernet_types::wire::VouchEnvelope;
use ordernet_transport::{topics, TransportHandle};

use crate::events::EventBus;
use crate::node::SharedState;
use crate::{invite, now_ms, trust, NodeError, Result};

/// A vouchee that just crossed a channel's threshold.
#[derive(Debug, Clone)]
pub struct VouchApproval {
    pub vouchee_pub: [u8; 32],
    pub channel_id: String,
}

pub struct VouchProtocol {
    state: SharedState,
    transport: TransportHandle,
    events: EventBus,
}

impl VouchProtocol {
    pub fn new(state: SharedState, transport: TransportHandle, events: EventBus) -> Self {
        Self {
            state,
            transport,
            events,
        }
    }

    /// Ask a channel member to sponsor us into a channel.
    pub async fn send_join_request(&self, peer: &str, channel_id: &str) -> Result<()> {
        let guard = self.state.lock().await;
        let envelope = VouchEnvelope::JoinRequest {
            requester_pub_key: guard.identity.public_key(),
            nickname: guard.identity.nickname().to_string(),
            channel_id: channel_id.to_string(),
            timestamp: now_ms(),
        };
        let wire = envelope.to_wire()?;
        drop(guard);

        self.transport
            .unicast(peer, topics::VOUCH_PROTOCOL_ID, wire)
            .await?;
        Ok(())
    }

    /// Sign a vouch for `vouchee_hex` on a channel, record it locally, and
    /// send it to the aggregating peer.
    pub async fn send_vouch(&self, peer: &str, vouchee_hex: &str, channel_id: &str) -> Result<()> {
        let vouchee_pub = fingerprint::decode_key(vouchee_hex)?;

        let guard = self.state.lock().await;
        let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
        let vouch = trust::create_vouch(
            conn,
            guard.identity.signing_key(),
            &vouchee_pub,
            channel_id,
            now_ms(),
        )?;
        drop(guard);

        let envelope = VouchEnvelope::Vouch {
            voucher_pub_key: vouch.voucher_pub_key,
            vouchee_pub_key: vouch.vouchee_pub_key,
            channel_id: vouch.channel_id,
            timestamp: vouch.timestamp,
            signature: vouch.signature,
        };
        self.transport
            .unicast(peer, topics::VOUCH_PROTOCOL_ID, envelope.to_wire()?)
            .await?;
        Ok(())
    }

    /// Handle a unicast on the vouch protocol.
    ///
    /// Returns the approval when this vouch pushed a pending request over
    /// the channel threshold.
    pub async fn receive(&self, payload: &[u8]) -> Result<Option<VouchApproval>> {
        let Ok(envelope) = VouchEnvelope::from_wire(payload) else {
            tracing::debug!("dropping malformed vouch envelope");
            return Ok(None);
        };

        match envelope {
            VouchEnvelope::JoinRequest {
                requester_pub_key,
                nickname,
                channel_id,
                timestamp,
            } => {
                let guard = self.state.lock().await;
                let conn = guard.conn.as_ref().ok_or(NodeError::Stopped)?;
                trust::create_join_request(conn, &requester_pub_key, &channel_id, timestamp)?;
                drop(guard);

                self.events.emit(NodeEvent::JoinRequest {
                    requester: hex::encode(requester_pub_key),
                    nickname,
                    channel_id,
                });
                Ok(None)
            }
            VouchEnvelope::Vouch {
                voucher_pub_key,
                vouchee_pub_key,
                channel_id,
                timestamp,
                signature,
            } => {
                let vouch = Vouch {
                    voucher_pub_key,
                    vouchee_pub_key,
                    channel_id,
                    timestamp,
                    signature,
                };
                if !trust::verify_vouch(&vouch) {
                    tracing::debug!("dropping vouch with invalid signature");
                    return Ok(None);
                }

                let guard = self.state.lock().await;
                let st = &*guard;
                let conn = st.conn.as_ref().ok_or(NodeError::Stopped)?;
                trust::save_vouch(conn, &vouch)?;

                self.events.emit(NodeEvent::VouchReceived {
                    voucher: hex::encode(vouch.voucher_pub_key),
                    vouchee: hex::encode(vouch.vouchee_pub_key),
                    channel_id: vouch.channel_id.clone(),
                });

                // Threshold evaluation needs the channel locally; vouches
                // for channels we are not in are recorded and nothing more.
                if st.channels.get(&vouch.channel_id).is_none() {
                    return Ok(None);
                }
                let outcome = invite::process_vouch_and_check_threshold(
                    conn,
                    &st.channels,
                    &vouch.vouchee_pub_key,
                    &vouch.channel_id,
                )?;
                drop(guard);

                if outcome.approved {
                    self.events.emit(NodeEvent::ChannelJoined {
                        channel_id: vouch.channel_id.clone(),
                    });
                    return Ok(Some(VouchApproval {
                        vouchee_pub: vouch.vouchee_pub_key,
                        channel_id: vouch.channel_id,
                    }));
                }
                Ok(None)
            }
        }
    }
}
