//! Topic names and unicast protocol ids.

/// Prefix of per-channel chat topics.
pub const CHAT_TOPIC_PREFIX: &str = "/ordernet/chat/1.0.0/";

/// The well-known presence topic.
pub const PRESENCE_TOPIC: &str = "/ordernet/presence/1.0.0";

/// Unicast protocol id for join requests and vouches.
pub const VOUCH_PROTOCOL_ID: &str = "/ordernet/vouch/1.0.0";

/// Unicast protocol id for group-key delivery.
pub const KEYEX_PROTOCOL_ID: &str = "/ordernet/keyex/1.0.0";

/// The chat topic of a channel.
pub fn chat_topic(channel_id: &str) -> String {
    format!("{CHAT_TOPIC_PREFIX}{channel_id}")
}

/// Recover the channel id from a chat topic. Returns `None` for topics
/// outside the chat namespace or with an empty suffix.
pub fn channel_from_topic(topic: &str) -> Option<&str> {
    let suffix = topic.strip_prefix(CHAT_TOPIC_PREFIX)?;
    if suffix.is_empty() {
        None
    } else {
        Some(suffix)
    }
}
