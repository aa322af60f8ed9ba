//! Invites: portable invite codes, threshold evaluation, and key-exchange
//! payload construction.
//!
//! An invite code is the full channel bundle (config + group key) as
//! base64url JSON, shared out of band. The online path instead crosses a
//! vouch threshold and delivers the group key over the key-exchange
//! protocol, wrapped to the recipient's identity.

use base64::Engine;
use ordernet_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use ordernet_crypto::{aead, kdf, x25519};
use ordernet_db::queries::join_requests;
use ordernet_types::channel::{ChannelConfig, ChannelState};
use ordernet_types::trust::JoinRequestStatus;
use ordernet_types::wire::{InviteCodePayload, KeyExchangePayload};
use ordernet_types::{GroupKey, INVITE_CODE_VERSION};
use rusqlite::Connection;

use crate::channels::ChannelManager;
use crate::{NodeError, Result};

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Encode a channel as a portable invite code.
pub fn encode_invite_code(state: &ChannelState) -> Result<String> {
    let payload = InviteCodePayload {
        version: INVITE_CODE_VERSION,
        id: state.config.id.clone(),
        name: state.config.name.clone(),
        creator_pub_key_hex: hex::encode(state.config.creator_pub_key),
        vouch_threshold: state.config.vouch_threshold,
        access_mode: state.config.access_mode,
        invite_only: state.config.invite_only,
        allowed_members: state.config.allowed_members.clone(),
        created_at: state.config.created_at,
        group_key_hex: hex::encode(state.group_key),
    };
    let json = serde_json::to_vec(&payload)?;
    Ok(BASE64.encode(json))
}

/// Decode an invite code into a channel config and group key.
///
/// Any decode, parse, length, or hex failure yields `None` — a bad code is
/// an expected user input, never an error.
pub fn parse_invite_code(code: &str) -> Option<(ChannelConfig, GroupKey)> {
    let json = BASE64.decode(code.trim()).ok()?;
    let payload: InviteCodePayload = serde_json::from_slice(&json).ok()?;
    if payload.version != INVITE_CODE_VERSION {
        return None;
    }

    let creator: [u8; 32] = hex::decode(&payload.creator_pub_key_hex)
        .ok()?
        .try_into()
        .ok()?;
    let group_key: GroupKey = hex::decode(&payload.group_key_hex).ok()?.try_into().ok()?;

    let config = ChannelConfig {
        id: payload.id,
        name: payload.name,
        creator_pub_key: creator,
        vouch_threshold: payload.vouch_threshold,
        created_at: payload.created_at,
        access_mode: payload.access_mode,
        invite_only: payload.invite_only,
        allowed_members: payload
            .allowed_members
            .into_iter()
            .map(|m| m.to_lowercase())
            .collect(),
    };
    Some((config, group_key))
}

/// Outcome of a threshold evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdOutcome {
    /// True only on the pending → approved transition.
    pub approved: bool,
    pub count: u32,
    pub threshold: u32,
}

/// Compare a vouchee's vouch count against the channel threshold and mark
/// the join request approved when it is crossed.
///
/// `approved` fires once: a request already approved reports `false` so
/// the caller does not re-send the group key on every further vouch.
pub fn process_vouch_and_check_threshold(
    conn: &Connection,
    channels: &ChannelManager,
    vouchee_pub: &[u8; 32],
    channel_id: &str,
) -> Result<ThresholdOutcome> {
    let state = channels
        .get(channel_id)
        .ok_or_else(|| NodeError::UnknownChannel(channel_id.to_string()))?;
    let threshold = state.config.vouch_threshold;
    let count = crate::trust::vouch_count(conn, vouchee_pub, channel_id)?;

    if count < threshold {
        return Ok(ThresholdOutcome {
            approved: false,
            count,
            threshold,
        });
    }

    let already_approved = join_requests::get(conn, vouchee_pub, channel_id)?
        .map(|row| JoinRequestStatus::parse(&row.status) == JoinRequestStatus::Approved)
        .unwrap_or(false);
    if already_approved {
        return Ok(ThresholdOutcome {
            approved: false,
            count,
            threshold,
        });
    }

    crate::trust::approve_request(conn, vouchee_pub, channel_id)?;
    Ok(ThresholdOutcome {
        approved: true,
        count,
        threshold,
    })
}

/// Build a key-exchange payload carrying `group_key` to `recipient_pub`.
///
/// A fresh X25519 ephemeral pair is exchanged against the recipient's
/// converted identity key; the wrap key is HKDF-SHA256 over the shared
/// secret, and the sender signs the canonical
/// `{sender, recipient, channel, timestamp}`.
pub fn create_key_exchange(
    signer: &SigningKey,
    recipient_pub: &[u8; 32],
    channel_id: &str,
    group_key: &GroupKey,
    now: u64,
) -> Result<KeyExchangePayload> {
    let recipient_key = VerifyingKey::from_bytes(recipient_pub)?;
    let recipient_x = x25519::montgomery_from_ed25519(&recipient_key)?;
    let (ephemeral_pub, shared) = x25519::ephemeral_key_exchange(&recipient_x);
    let wrap_key = kdf::derive_keyex_key(shared.as_bytes())?;
    let nonce = aead::generate_nonce();
    let encrypted_group_key = aead::encrypt_no_aad(&wrap_key, &nonce, group_key)?;

    let mut payload = KeyExchangePayload {
        sender_pub_key: signer.verifying_key().to_bytes(),
        recipient_pub_key: *recipient_pub,
        channel_id: channel_id.to_string(),
        encrypted_group_key,
        ephemeral_pub_key: ephemeral_pub.to_bytes(),
        nonce,
        timestamp: now,
        signature: [0u8; 64],
    };
    payload.signature = signer.sign(&payload.signable_bytes()?).to_bytes();
    Ok(payload)
}

/// Verify and unwrap a received key-exchange payload.
///
/// The signature over the canonical signed portion must hold and the AEAD
/// must open under the key derived from our identity; either failure is a
/// [`NodeError::Crypto`] the caller drops locally.
pub fn open_key_exchange(
    identity: &SigningKey,
    payload: &KeyExchangePayload,
) -> Result<GroupKey> {
    let sender_key = VerifyingKey::from_bytes(&payload.sender_pub_key)?;
    sender_key.verify(
        &payload.signable_bytes()?,
        &Signature::from_bytes(&payload.signature),
    )?;

    let my_x = x25519::x25519_secret_from_ed25519(identity);
    let shared = my_x.diffie_hellman(&x25519::X25519PublicKey::from_bytes(
        payload.ephemeral_pub_key,
    ));
    let wrap_key = kdf::derive_keyex_key(shared.as_bytes())?;
    let key_bytes = aead::decrypt_no_aad(&wrap_key, &payload.nonce, &payload.encrypted_group_key)?;

    key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| {
            NodeError::Crypto(ordernet_crypto::CryptoError::InvalidKeyLength {
                expected: 32,
                actual: key_bytes.len(),
            })
        })
}
