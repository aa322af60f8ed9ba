//! Vouch table access.
//!
//! The composite primary key (voucher, vouchee, channel) makes repeated
//! vouching by the same voucher a no-op.

use rusqlite::Connection;

use crate::Result;

/// A raw vouch row.
#[derive(Debug, Clone)]
pub struct VouchRow {
    pub voucher_pub_key: Vec<u8>,
    pub vouchee_pub_key: Vec<u8>,
    pub channel_id: String,
    pub timestamp: u64,
    pub signature: Vec<u8>,
}

/// Insert a vouch if none exists for this (voucher, vouchee, channel).
/// Returns whether a row was written.
pub fn insert(conn: &Connection, row: &VouchRow) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO vouches
             (voucher_pub_key, vouchee_pub_key, channel_id, timestamp, signature)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            row.voucher_pub_key,
            row.vouchee_pub_key,
            row.channel_id,
            row.timestamp as i64,
            row.signature,
        ],
    )?;
    Ok(changed > 0)
}

/// Number of distinct vouchers for a vouchee on a channel.
pub fn count_for(conn: &Connection, vouchee: &[u8; 32], channel_id: &str) -> Result<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM vouches WHERE vouchee_pub_key = ?1 AND channel_id = ?2",
        rusqlite::params![vouchee.as_slice(), channel_id],
        |row| row.get(0),
    )?;
    Ok(count as u32)
}

/// All (voucher, vouchee) pairs recorded for a channel, as raw key bytes.
pub fn edges(conn: &Connection, channel_id: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT voucher_pub_key, vouchee_pub_key FROM vouches
         WHERE channel_id = ?1 ORDER BY timestamp",
    )?;
    let rows = stmt
        .query_map([channel_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(voucher: u8, vouchee: u8) -> VouchRow {
        VouchRow {
            voucher_pub_key: vec![voucher; 32],
            vouchee_pub_key: vec![vouchee; 32],
            channel_id: "general".into(),
            timestamp: 1000,
            signature: vec![0u8; 64],
        }
    }

    #[test]
    fn test_double_vouch_is_ignored() {
        let conn = crate::open_memory().expect("open");
        assert!(insert(&conn, &sample(1, 2)).expect("insert"));
        assert!(!insert(&conn, &sample(1, 2)).expect("duplicate"));
        assert_eq!(count_for(&conn, &[2u8; 32], "general").expect("count"), 1);
    }

    #[test]
    fn test_count_distinct_vouchers() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample(1, 9)).expect("insert");
        insert(&conn, &sample(2, 9)).expect("insert");
        insert(&conn, &sample(3, 8)).expect("other vouchee");

        assert_eq!(count_for(&conn, &[9u8; 32], "general").expect("count"), 2);
        assert_eq!(count_for(&conn, &[8u8; 32], "general").expect("count"), 1);
        assert_eq!(count_for(&conn, &[9u8; 32], "other").expect("count"), 0);
    }

    #[test]
    fn test_edges() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample(1, 2)).expect("insert");
        insert(&conn, &sample(2, 3)).expect("insert");

        let edges = edges(&conn, "general").expect("edges");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].0, vec![1u8; 32]);
        assert_eq!(edges[0].1, vec![2u8; 32]);
    }
}
