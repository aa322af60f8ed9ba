//! Identity row access. Exactly one row, id = 1.

use rusqlite::Connection;

use crate::Result;

/// The stored identity: public key in the clear, private key wrapped under
/// an Argon2id-derived key.
#[derive(Debug)]
pub struct IdentityRow {
    pub public_key: Vec<u8>,
    pub encrypted_private_key: Vec<u8>,
    pub argon2id_salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub nickname: String,
    pub created_at: u64,
}

/// Fetch the identity row, if one exists.
pub fn get(conn: &Connection) -> Result<Option<IdentityRow>> {
    let mut stmt = conn.prepare(
        "SELECT public_key, encrypted_private_key, argon2id_salt, nonce, nickname, created_at
         FROM identity WHERE id = 1",
    )?;
    let mut rows = stmt.query_map([], |row| {
        Ok(IdentityRow {
            public_key: row.get(0)?,
            encrypted_private_key: row.get(1)?,
            argon2id_salt: row.get(2)?,
            nonce: row.get(3)?,
            nickname: row.get(4)?,
            created_at: row.get::<_, i64>(5)? as u64,
        })
    })?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Insert the identity row. Fails if one already exists.
pub fn insert(conn: &Connection, row: &IdentityRow) -> Result<()> {
    conn.execute(
        "INSERT INTO identity (id, public_key, encrypted_private_key, argon2id_salt, nonce, nickname, created_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            row.public_key,
            row.encrypted_private_key,
            row.argon2id_salt,
            row.nonce,
            row.nickname,
            row.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Update the stored nickname.
pub fn set_nickname(conn: &Connection, nickname: &str) -> Result<()> {
    conn.execute(
        "UPDATE identity SET nickname = ?1 WHERE id = 1",
        [nickname],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IdentityRow {
        IdentityRow {
            public_key: vec![1u8; 32],
            encrypted_private_key: vec![2u8; 48],
            argon2id_salt: vec![3u8; 16],
            nonce: vec![4u8; 24],
            nickname: "alice".into(),
            created_at: 1000,
        }
    }

    #[test]
    fn test_get_empty() {
        let conn = crate::open_memory().expect("open");
        assert!(get(&conn).expect("get").is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample()).expect("insert");

        let row = get(&conn).expect("get").expect("row");
        assert_eq!(row.public_key, vec![1u8; 32]);
        assert_eq!(row.nickname, "alice");
        assert_eq!(row.created_at, 1000);
    }

    #[test]
    fn test_single_row_enforced() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample()).expect("insert");
        assert!(insert(&conn, &sample()).is_err());
    }

    #[test]
    fn test_set_nickname() {
        let conn = crate::open_memory().expect("open");
        insert(&conn, &sample()).expect("insert");
        set_nickname(&conn, "alice2").expect("update");
        let row = get(&conn).expect("get").expect("row");
        assert_eq!(row.nickname, "alice2");
    }
}
