//! Channel table access.

use rusqlite::Connection;

use crate::Result;

/// A raw channel row. `allowed_members` is a JSON array of lowercase hex
/// public keys, or NULL for channels without an allowlist.
#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub creator_pub_key: Vec<u8>,
    pub vouch_threshold: u32,
    pub group_key: Vec<u8>,
    pub created_at: u64,
    pub access_mode: String,
    pub invite_only: bool,
    pub allowed_members: Option<String>,
}

/// Insert or fully replace a channel.
pub fn upsert(conn: &Connection, row: &ChannelRow) -> Result<()> {
    conn.execute(
        "INSERT INTO channels
             (id, name, creator_pub_key, vouch_threshold, group_key, created_at,
              access_mode, invite_only, allowed_members)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             creator_pub_key = excluded.creator_pub_key,
             vouch_threshold = excluded.vouch_threshold,
             group_key = excluded.group_key,
             access_mode = excluded.access_mode,
             invite_only = excluded.invite_only,
             allowed_members = excluded.allowed_members",
        rusqlite::params![
            row.id,
            row.name,
            row.creator_pub_key,
            row.vouch_threshold,
            row.group_key,
            row.created_at as i64,
            row.access_mode,
            row.invite_only,
            row.allowed_members,
        ],
    )?;
    Ok(())
}

/// Get a channel by id.
pub fn get(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, creator_pub_key, vouch_threshold, group_key, created_at,
                access_mode, invite_only, allowed_members
         FROM channels WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map([id], row_to_channel)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// List all channels.
pub fn list(conn: &Connection) -> Result<Vec<ChannelRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, creator_pub_key, vouch_threshold, group_key, created_at,
                access_mode, invite_only, allowed_members
         FROM channels ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], row_to_channel)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete a channel. Its messages go with it through the foreign key.
pub fn remove(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM channels WHERE id = ?1", [id])?;
    Ok(())
}

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_pub_key: row.get(2)?,
        vouch_threshold: row.get::<_, i64>(3)? as u32,
        group_key: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        access_mode: row.get(6)?,
        invite_only: row.get(7)?,
        allowed_members: row.get(8)?,
    })
}
