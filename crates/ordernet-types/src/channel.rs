//! Channel configuration and runtime state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{GroupKey, PubKeyBytes};

/// How a channel admits senders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Public,
    Private,
    Dm,
}

impl AccessMode {
    /// Store representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Public => "public",
            AccessMode::Private => "private",
            AccessMode::Dm => "dm",
        }
    }

    /// Parse the store representation; unknown strings fall back to public.
    pub fn parse(s: &str) -> Self {
        match s {
            "private" => AccessMode::Private,
            "dm" => AccessMode::Dm,
            _ => AccessMode::Public,
        }
    }
}

/// Channel metadata. Immutable by intent once created, except that inviting
/// a member to a public channel flips it to invite-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// The name without the leading `#`.
    pub id: String,
    /// Display name, usually `#` + id.
    pub name: String,
    pub creator_pub_key: PubKeyBytes,
    pub vouch_threshold: u32,
    pub created_at: u64,
    pub access_mode: AccessMode,
    pub invite_only: bool,
    /// Lowercase hex public keys allowed to send when invite-only.
    pub allowed_members: BTreeSet<String>,
}

/// In-memory channel state: config plus the group key and the set of
/// members seen on the channel. The creator is always a member; the local
/// identity is inserted whenever the channel is joined locally.
#[derive(Clone, Debug)]
pub struct ChannelState {
    pub config: ChannelConfig,
    pub group_key: GroupKey,
    /// Lowercase hex public keys.
    pub members: BTreeSet<String>,
}

impl ChannelState {
    /// Build runtime state from a config and key. Seeds `members` with the
    /// creator.
    pub fn new(config: ChannelConfig, group_key: GroupKey) -> Self {
        let mut members = BTreeSet::new();
        members.insert(hex::encode(config.creator_pub_key));
        Self {
            config,
            group_key,
            members,
        }
    }

    /// Whether `peer_hex` may send on this channel: always when the channel
    /// is not invite-only, otherwise only when the key is on the allowlist.
    /// Comparison is case-insensitive.
    pub fn has_access(&self, peer_hex: &str) -> bool {
        if !self.config.invite_only {
            return true;
        }
        self.config
            .allowed_members
            .contains(&peer_hex.to_lowercase())
    }
}

/// Strip the leading `#` from a user-facing channel name to get its id.
pub fn channel_id_from_name(name: &str) -> String {
    name.strip_prefix('#').unwrap_or(name).to_string()
}

/// Derive the id of the direct-message channel between two identities.
///
/// Both endpoints must compute the same id, so the two hex keys are sorted
/// lexicographically before each is truncated to 16 characters.
pub fn dm_channel_id(a_hex: &str, b_hex: &str) -> String {
    let (lo, hi) = if a_hex <= b_hex {
        (a_hex, b_hex)
    } else {
        (b_hex, a_hex)
    };
    let lo_short: String = lo.chars().take(16).collect();
    let hi_short: String = hi.chars().take(16).collect();
    format!("dm-{lo_short}-{hi_short}")
}
