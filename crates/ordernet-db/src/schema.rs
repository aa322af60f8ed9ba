//! SQL schema definitions.
//!
//! The base schema predates channel access control; `access_mode`,
//! `invite_only`, and `allowed_members` are added by the forward
//! migrations in [`crate::migrations`].

/// Base schema for the node database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identity (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    public_key BLOB NOT NULL,
    encrypted_private_key BLOB NOT NULL,
    argon2id_salt BLOB NOT NULL,
    nonce BLOB NOT NULL,
    nickname TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS peers (
    public_key BLOB PRIMARY KEY,
    nickname TEXT NOT NULL,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    multiaddrs TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    creator_pub_key BLOB NOT NULL,
    vouch_threshold INTEGER NOT NULL DEFAULT 2,
    group_key BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    sender_pub_key BLOB NOT NULL,
    nonce BLOB NOT NULL,
    ciphertext BLOB NOT NULL,
    signature BLOB NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_time ON messages(channel_id, timestamp);

CREATE TABLE IF NOT EXISTS vouches (
    voucher_pub_key BLOB NOT NULL,
    vouchee_pub_key BLOB NOT NULL,
    channel_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    signature BLOB NOT NULL,
    PRIMARY KEY (voucher_pub_key, vouchee_pub_key, channel_id)
);

CREATE INDEX IF NOT EXISTS idx_vouches_vouchee ON vouches(vouchee_pub_key, channel_id);

CREATE TABLE IF NOT EXISTS join_requests (
    requester_pub_key BLOB NOT NULL,
    channel_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    vouches_received INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending',
    PRIMARY KEY (requester_pub_key, channel_id)
);
"#;

/// Forward-only column additions, attempted on every open. A failure caused
/// by the column already existing is absorbed by the migration runner.
pub const FORWARD_MIGRATIONS: &[&str] = &[
    "ALTER TABLE channels ADD COLUMN access_mode TEXT NOT NULL DEFAULT 'public';",
    "ALTER TABLE channels ADD COLUMN invite_only INTEGER NOT NULL DEFAULT 0;",
    "ALTER TABLE channels ADD COLUMN allowed_members TEXT;",
];
