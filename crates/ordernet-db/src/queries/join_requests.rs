//! Join-request table access.

use rusqlite::Connection;

use crate::Result;

/// A raw join-request row.
#[derive(Debug, Clone)]
pub struct JoinRequestRow {
    pub requester_pub_key: Vec<u8>,
    pub channel_id: String,
    pub timestamp: u64,
    pub vouches_received: u32,
    pub status: String,
}

/// Record a join request if none exists for this (requester, channel).
/// Returns whether a row was written.
pub fn insert(
    conn: &Connection,
    requester: &[u8; 32],
    channel_id: &str,
    timestamp: u64,
) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO join_requests
             (requester_pub_key, channel_id, timestamp, vouches_received, status)
         VALUES (?1, ?2, ?3, 0, 'pending')",
        rusqlite::params![requester.as_slice(), channel_id, timestamp as i64],
    )?;
    Ok(changed > 0)
}

/// Get a join request.
pub fn get(
    conn: &Connection,
    requester: &[u8; 32],
    channel_id: &str,
) -> Result<Option<JoinRequestRow>> {
    let mut stmt = conn.prepare(
        "SELECT requester_pub_key, channel_id, timestamp, vouches_received, status
         FROM join_requests WHERE requester_pub_key = ?1 AND channel_id = ?2",
    )?;
    let mut rows = stmt.query_map(
        rusqlite::params![requester.as_slice(), channel_id],
        row_to_request,
    )?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// List requests for a channel, oldest first.
pub fn list_for_channel(conn: &Connection, channel_id: &str) -> Result<Vec<JoinRequestRow>> {
    let mut stmt = conn.prepare(
        "SELECT requester_pub_key, channel_id, timestamp, vouches_received, status
         FROM join_requests WHERE channel_id = ?1 ORDER BY timestamp",
    )?;
    let rows = stmt
        .query_map([channel_id], row_to_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrite the cached vouch count.
pub fn set_vouches_received(
    conn: &Connection,
    requester: &[u8; 32],
    channel_id: &str,
    count: u32,
) -> Result<()> {
    conn.execute(
        "UPDATE join_requests SET vouches_received = ?1
         WHERE requester_pub_key = ?2 AND channel_id = ?3",
        rusqlite::params![count, requester.as_slice(), channel_id],
    )?;
    Ok(())
}

/// Transition the request status.
pub fn set_status(
    conn: &Connection,
    requester: &[u8; 32],
    channel_id: &str,
    status: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE join_requests SET status = ?1
         WHERE requester_pub_key = ?2 AND channel_id = ?3",
        rusqlite::params![status, requester.as_slice(), channel_id],
    )?;
    Ok(())
}

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<JoinRequestRow> {
    Ok(JoinRequestRow {
        requester_pub_key: row.get(0)?,
        channel_id: row.get(1)?,
        timestamp: row.get::<_, i64>(2)? as u64,
        vouches_received: row.get::<_, i64>(3)? as u32,
        status: row.get(4)?,
    })
}
