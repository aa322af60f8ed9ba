//! Observed-peer table access.

use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw peer row.
#[derive(Debug)]
pub struct PeerRow {
    pub public_key: Vec<u8>,
    pub nickname: String,
    pub first_seen: u64,
    pub last_seen: u64,
    /// JSON array of multiaddr strings.
    pub multiaddrs: String,
}

/// Record a presence sighting: insert the peer or refresh its nickname and
/// last-seen time, keeping first-seen and known addresses.
pub fn upsert_presence(
    conn: &Connection,
    public_key: &[u8; 32],
    nickname: &str,
    seen_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO peers (public_key, nickname, first_seen, last_seen)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(public_key) DO UPDATE SET
             nickname = excluded.nickname,
             last_seen = excluded.last_seen",
        rusqlite::params![public_key.as_slice(), nickname, seen_at as i64],
    )?;
    Ok(())
}

/// Append a dialable address for a peer if it is not already known.
/// No-ops for peers that have never announced presence.
pub fn add_address(conn: &Connection, public_key: &[u8; 32], addr: &str) -> Result<()> {
    let Some(row) = get(conn, public_key)? else {
        return Ok(());
    };
    let mut addrs: Vec<String> = serde_json::from_str(&row.multiaddrs)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    if addrs.iter().any(|a| a == addr) {
        return Ok(());
    }
    addrs.push(addr.to_string());
    let encoded =
        serde_json::to_string(&addrs).map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "UPDATE peers SET multiaddrs = ?1 WHERE public_key = ?2",
        rusqlite::params![encoded, public_key.as_slice()],
    )?;
    Ok(())
}

/// Get a peer by public key.
pub fn get(conn: &Connection, public_key: &[u8; 32]) -> Result<Option<PeerRow>> {
    let mut stmt = conn.prepare(
        "SELECT public_key, nickname, first_seen, last_seen, multiaddrs
         FROM peers WHERE public_key = ?1",
    )?;
    let mut rows = stmt.query_map([public_key.as_slice()], row_to_peer)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// List all known peers, most recently seen first.
pub fn list(conn: &Connection) -> Result<Vec<PeerRow>> {
    let mut stmt = conn.prepare(
        "SELECT public_key, nickname, first_seen, last_seen, multiaddrs
         FROM peers ORDER BY last_seen DESC",
    )?;
    let rows = stmt
        .query_map([], row_to_peer)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_peer(row: &rusqlite::Row<'_>) -> rusqlite::Result<PeerRow> {
    Ok(PeerRow {
        public_key: row.get(0)?,
        nickname: row.get(1)?,
        first_seen: row.get::<_, i64>(2)? as u64,
        last_seen: row.get::<_, i64>(3)? as u64,
        multiaddrs: row.get(4)?,
    })
}
