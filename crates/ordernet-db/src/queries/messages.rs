//! Message table access.
//!
//! Messages are stored in their encrypted wire form. Insertion is
//! idempotent on `message_id`, which is what makes gossip redelivery safe.

use rusqlite::Connection;

use crate::Result;

/// A raw message row holding the encrypted envelope fields.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub message_id: String,
    pub channel_id: String,
    pub sender_pub_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub signature: Vec<u8>,
    pub timestamp: u64,
}

/// Insert a message if its id is new. Returns whether a row was written.
pub fn insert(conn: &Connection, row: &MessageRow) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO messages
             (message_id, channel_id, sender_pub_key, nonce, ciphertext, signature, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.message_id,
            row.channel_id,
            row.sender_pub_key,
            row.nonce,
            row.ciphertext,
            row.signature,
            row.timestamp as i64,
        ],
    )?;
    Ok(changed > 0)
}

/// Whether a message id has been seen before.
pub fn exists(conn: &Connection, message_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE message_id = ?1",
        [message_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// The most recent `limit` messages of a channel, oldest first.
pub fn history(conn: &Connection, channel_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT message_id, channel_id, sender_pub_key, nonce, ciphertext, signature, timestamp
         FROM (SELECT * FROM messages WHERE channel_id = ?1
               ORDER BY timestamp DESC, id DESC LIMIT ?2)
         ORDER BY timestamp ASC, id ASC",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![channel_id, limit], |row| {
            Ok(MessageRow {
                message_id: row.get(0)?,
                channel_id: row.get(1)?,
                sender_pub_key: row.get(2)?,
                nonce: row.get(3)?,
                ciphertext: row.get(4)?,
                signature: row.get(5)?,
                timestamp: row.get::<_, i64>(6)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open");
        crate::queries::channels::upsert(
            &conn,
            &crate::queries::channels::ChannelRow {
                id: "general".into(),
                name: "#general".into(),
                creator_pub_key: vec![1u8; 32],
                vouch_threshold: 2,
                group_key: vec![2u8; 32],
                created_at: 0,
                access_mode: "public".into(),
                invite_only: false,
                allowed_members: None,
            },
        )
        .expect("channel");
        conn
    }

    fn sample(id: &str, timestamp: u64) -> MessageRow {
        MessageRow {
            message_id: id.into(),
            channel_id: "general".into(),
            sender_pub_key: vec![1u8; 32],
            nonce: vec![0u8; 24],
            ciphertext: vec![1, 2, 3],
            signature: vec![0u8; 64],
            timestamp,
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let conn = test_db();
        assert!(insert(&conn, &sample("m1", 1)).expect("insert"));
        assert!(!insert(&conn, &sample("m1", 1)).expect("duplicate ignored"));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_exists() {
        let conn = test_db();
        assert!(!exists(&conn, "m1").expect("exists"));
        insert(&conn, &sample("m1", 1)).expect("insert");
        assert!(exists(&conn, "m1").expect("exists"));
    }

    #[test]
    fn test_insert_requires_channel() {
        let conn = test_db();
        let mut row = sample("m1", 1);
        row.channel_id = "nonexistent".into();
        assert!(insert(&conn, &row).is_err());
    }

    #[test]
    fn test_history_returns_recent_oldest_first() {
        let conn = test_db();
        for i in 0..5u64 {
            insert(&conn, &sample(&format!("m{i}"), i * 10)).expect("insert");
        }

        let rows = history(&conn, "general", 3).expect("history");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].message_id, "m2");
        assert_eq!(rows[2].message_id, "m4");
        assert!(rows[0].timestamp < rows[2].timestamp);
    }
}
