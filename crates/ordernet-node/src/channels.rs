//! Channel management.
//!
//! The in-memory channel table is the authoritative runtime copy; every
//! mutation re-persists the channel row, and construction repopulates the
//! table from the store.

use std::collections::{BTreeSet, HashMap};

use ordernet_crypto::{aead, kdf};
use ordernet_db::queries::channels as channel_queries;
use ordernet_types::channel::{
    channel_id_from_name, dm_channel_id, AccessMode, ChannelConfig, ChannelState,
};
use ordernet_types::{GroupKey, DEFAULT_VOUCH_THRESHOLD};
use rusqlite::Connection;

use crate::{now_ms, NodeError, Result};

/// Overrides for [`ChannelManager::create_channel`].
#[derive(Debug, Clone, Default)]
pub struct ChannelOptions {
    pub access_mode: Option<AccessMode>,
    pub invite_only: Option<bool>,
    /// Additional allowed members (lowercase hex), beyond the local identity.
    pub allowed_members: BTreeSet<String>,
}

/// In-memory channel table, mirrored to the store.
pub struct ChannelManager {
    self_pub: [u8; 32],
    self_hex: String,
    channels: HashMap<String, ChannelState>,
}

impl ChannelManager {
    /// Load all channels from the store. The local identity is inserted
    /// into every channel's member set.
    pub fn load(conn: &Connection, self_pub: [u8; 32]) -> Result<Self> {
        let self_hex = hex::encode(self_pub);
        let mut channels = HashMap::new();
        for row in channel_queries::list(conn)? {
            let mut state = row_to_state(&row)?;
            state.members.insert(self_hex.clone());
            channels.insert(state.config.id.clone(), state);
        }
        Ok(Self {
            self_pub,
            self_hex,
            channels,
        })
    }

    /// Lowercase hex of the local identity.
    pub fn self_hex(&self) -> &str {
        &self.self_hex
    }

    pub fn get(&self, id: &str) -> Option<&ChannelState> {
        self.channels.get(id)
    }

    /// Ids of all joined channels, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of all channel states, sorted by id.
    pub fn list(&self) -> Vec<ChannelState> {
        let mut states: Vec<ChannelState> = self.channels.values().cloned().collect();
        states.sort_by(|a, b| a.config.id.cmp(&b.config.id));
        states
    }

    /// Create a channel, or return the existing state when the id is taken.
    ///
    /// Public channels derive their group key from the channel id so that
    /// nodes joining the same name independently converge on one key;
    /// anything invite-only gets a fresh random key.
    pub fn create_channel(
        &mut self,
        conn: &Connection,
        name: &str,
        threshold: Option<u32>,
        opts: ChannelOptions,
    ) -> Result<ChannelState> {
        let id = channel_id_from_name(name);
        if let Some(existing) = self.channels.get(&id) {
            return Ok(existing.clone());
        }

        let access_mode = opts.access_mode.unwrap_or(AccessMode::Public);
        let invite_only = opts.invite_only.unwrap_or(false);
        let group_key = if access_mode == AccessMode::Public && !invite_only {
            kdf::derive_channel_key(&id)
        } else {
            aead::generate_key()
        };

        let mut allowed_members = opts.allowed_members;
        allowed_members.insert(self.self_hex.clone());

        let config = ChannelConfig {
            id: id.clone(),
            name: format!("#{id}"),
            creator_pub_key: self.self_pub,
            vouch_threshold: threshold.unwrap_or(DEFAULT_VOUCH_THRESHOLD),
            created_at: now_ms(),
            access_mode,
            invite_only,
            allowed_members,
        };

        self.install(conn, config, group_key)
    }

    /// Create an invite-only private channel with an explicit allowlist.
    pub fn create_private_channel(
        &mut self,
        conn: &Connection,
        name: &str,
        allowed_hexes: &[String],
        threshold: Option<u32>,
    ) -> Result<ChannelState> {
        let allowed_members: BTreeSet<String> =
            allowed_hexes.iter().map(|h| h.to_lowercase()).collect();
        self.create_channel(
            conn,
            name,
            Some(threshold.unwrap_or(1)),
            ChannelOptions {
                access_mode: Some(AccessMode::Private),
                invite_only: Some(true),
                allowed_members,
            },
        )
    }

    /// Create (or return) the direct-message channel with a peer. Both
    /// endpoints derive the same channel id; the initiating side generates
    /// the key and delivers it to the peer over the key-exchange protocol.
    pub fn create_dm_channel(&mut self, conn: &Connection, peer_hex: &str) -> Result<ChannelState> {
        let peer_hex = peer_hex.to_lowercase();
        let id = dm_channel_id(&self.self_hex, &peer_hex);
        if let Some(existing) = self.channels.get(&id) {
            return Ok(existing.clone());
        }

        let mut allowed_members = BTreeSet::new();
        allowed_members.insert(self.self_hex.clone());
        allowed_members.insert(peer_hex);

        let config = ChannelConfig {
            id: id.clone(),
            name: format!("#{id}"),
            creator_pub_key: self.self_pub,
            vouch_threshold: 1,
            created_at: now_ms(),
            access_mode: AccessMode::Dm,
            invite_only: true,
            allowed_members,
        };

        self.install(conn, config, aead::generate_key())
    }

    /// Adopt a full config and group key from an invite code or a
    /// key-exchange delivery.
    pub fn join_channel(
        &mut self,
        conn: &Connection,
        config: ChannelConfig,
        group_key: GroupKey,
    ) -> Result<ChannelState> {
        self.install(conn, config, group_key)
    }

    /// Remove a channel from memory and from the store. Returns whether it
    /// existed.
    pub fn leave_channel(&mut self, conn: &Connection, id: &str) -> Result<bool> {
        if self.channels.remove(id).is_none() {
            return Ok(false);
        }
        channel_queries::remove(conn, id)?;
        Ok(true)
    }

    /// Allow a peer to send on a channel.
    ///
    /// A public channel that is not invite-only admits everyone already, so
    /// this is a no-op there. Otherwise the peer joins the allowlist and the
    /// channel becomes invite-only.
    pub fn invite_member(&mut self, conn: &Connection, id: &str, peer_hex: &str) -> Result<()> {
        let state = self
            .channels
            .get_mut(id)
            .ok_or_else(|| NodeError::UnknownChannel(id.to_string()))?;

        if state.config.access_mode == AccessMode::Public && !state.config.invite_only {
            return Ok(());
        }

        state
            .config
            .allowed_members
            .insert(peer_hex.to_lowercase());
        state.config.invite_only = true;
        channel_queries::upsert(conn, &state_to_row(state))?;
        Ok(())
    }

    /// Whether `peer_hex` may send on channel `id`. Unknown channels admit
    /// no one.
    pub fn has_access(&self, id: &str, peer_hex: &str) -> bool {
        self.channels
            .get(id)
            .is_some_and(|state| state.has_access(peer_hex))
    }

    /// Note a sender observed on a channel.
    pub fn record_member(&mut self, id: &str, peer_hex: &str) {
        if let Some(state) = self.channels.get_mut(id) {
            state.members.insert(peer_hex.to_lowercase());
        }
    }

    fn install(
        &mut self,
        conn: &Connection,
        config: ChannelConfig,
        group_key: GroupKey,
    ) -> Result<ChannelState> {
        let mut state = ChannelState::new(config, group_key);
        state.members.insert(self.self_hex.clone());
        channel_queries::upsert(conn, &state_to_row(&state))?;
        self.channels.insert(state.config.id.clone(), state.clone());
        Ok(state)
    }
}

fn row_to_state(row: &channel_queries::ChannelRow) -> Result<ChannelState> {
    let creator_pub_key: [u8; 32] = row
        .creator_pub_key
        .as_slice()
        .try_into()
        .map_err(|_| NodeError::Storage(format!("corrupt creator key for '{}'", row.id)))?;
    let group_key: GroupKey = row
        .group_key
        .as_slice()
        .try_into()
        .map_err(|_| NodeError::Storage(format!("corrupt group key for '{}'", row.id)))?;
    let allowed_members: BTreeSet<String> = match &row.allowed_members {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| NodeError::Storage(format!("corrupt allowlist for '{}': {e}", row.id)))?,
        None => BTreeSet::new(),
    };

    let config = ChannelConfig {
        id: row.id.clone(),
        name: row.name.clone(),
        creator_pub_key,
        vouch_threshold: row.vouch_threshold,
        created_at: row.created_at,
        access_mode: AccessMode::parse(&row.access_mode),
        invite_only: row.invite_only,
        allowed_members,
    };
    Ok(ChannelState::new(config, group_key))
}

fn state_to_row(state: &ChannelState) -> channel_queries::ChannelRow {
    let allowed = if state.config.allowed_members.is_empty() {
        None
    } else {
        serde_json::to_string(&state.config.allowed_members).ok()
    };
    channel_queries::ChannelRow {
        id: state.config.id.clone(),
        name: state.config.name.clone(),
        creator_pub_key: state.config.creator_pub_key.to_vec(),
        vouch_threshold: state.config.vouch_threshold,
        group_key: state.group_key.to_vec(),
        created_at: state.config.created_at,
        access_mode: state.config.access_mode.as_str().to_string(),
        invite_only: state.config.invite_only,
        allowed_members: allowed,
    }
}
