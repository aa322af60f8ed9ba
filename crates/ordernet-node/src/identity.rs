//! Identity management.
//!
//! Exactly one identity exists per node. The Ed25519 seed is wrapped at
//! rest with XChaCha20-Poly1305 under an Argon2id-derived key; salt and
//! nonce live next to the ciphertext in the single identity row.

use ordernet_crypto::ed25519::KeyPair;
use ordernet_crypto::{aead, argon2id, fingerprint};
use ordernet_db::queries::identity as identity_queries;
use ordernet_types::identity::Identity;
use rusqlite::Connection;

use crate::{NodeError, Result};

/// Holds the unlocked identity keypair and nickname.
pub struct IdentityManager {
    keypair: KeyPair,
    nickname: String,
    created_at: u64,
}

impl IdentityManager {
    /// Load the stored identity, or create one on first start.
    ///
    /// An existing row is decrypted under `passphrase`; a wrong passphrase
    /// fails the AEAD tag and surfaces as [`NodeError::IdentityLocked`],
    /// which is fatal at start. A fresh identity is generated with
    /// `default_nickname`, wrapped under a freshly sampled salt and nonce,
    /// and inserted.
    pub fn load_or_create(
        conn: &Connection,
        passphrase: &str,
        default_nickname: &str,
        now: u64,
    ) -> Result<Self> {
        match identity_queries::get(conn)? {
            Some(row) => {
                let salt = row.argon2id_salt.as_slice();
                let key = argon2id::derive_key(passphrase.as_bytes(), salt)?;
                let nonce: [u8; aead::NONCE_SIZE] = row
                    .nonce
                    .as_slice()
                    .try_into()
                    .map_err(|_| NodeError::IdentityLocked)?;
                let seed_bytes =
                    aead::decrypt_no_aad(&key, &nonce, &row.encrypted_private_key)
                        .map_err(|_| NodeError::IdentityLocked)?;
                let seed: [u8; 32] = seed_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| NodeError::IdentityLocked)?;
                let keypair = KeyPair::from_bytes(&seed);
                tracing::info!(
                    fingerprint = %fingerprint::fingerprint(&keypair.verifying_key.to_bytes()),
                    "identity unlocked"
                );
                Ok(Self {
                    keypair,
                    nickname: row.nickname,
                    created_at: row.created_at,
                })
            }
            None => {
                let keypair = KeyPair::generate();
                let salt = argon2id::generate_salt();
                let key = argon2id::derive_key(passphrase.as_bytes(), &salt)?;
                let nonce = aead::generate_nonce();
                let encrypted =
                    aead::encrypt_no_aad(&key, &nonce, &keypair.signing_key.to_bytes())?;

                identity_queries::insert(
                    conn,
                    &identity_queries::IdentityRow {
                        public_key: keypair.verifying_key.to_bytes().to_vec(),
                        encrypted_private_key: encrypted,
                        argon2id_salt: salt.to_vec(),
                        nonce: nonce.to_vec(),
                        nickname: default_nickname.to_string(),
                        created_at: now,
                    },
                )?;
                tracing::info!(
                    fingerprint = %fingerprint::fingerprint(&keypair.verifying_key.to_bytes()),
                    "identity created"
                );
                Ok(Self {
                    keypair,
                    nickname: default_nickname.to_string(),
                    created_at: now,
                })
            }
        }
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.verifying_key.to_bytes()
    }

    /// Lowercase hex of the public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Short fingerprint for display.
    pub fn fingerprint(&self) -> String {
        fingerprint::fingerprint(&self.public_key())
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// The unlocked signing key.
    pub fn signing_key(&self) -> &ordernet_crypto::ed25519::SigningKey {
        &self.keypair.signing_key
    }

    /// Update the nickname in memory and in the store.
    pub fn set_nickname(&mut self, conn: &Connection, nickname: &str) -> Result<()> {
        identity_queries::set_nickname(conn, nickname)?;
        self.nickname = nickname.to_string();
        Ok(())
    }

    /// Snapshot as the shared identity record.
    pub fn identity(&self) -> Identity {
        Identity {
            public_key: self.public_key(),
            nickname: self.nickname.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_reload() {
        let conn = ordernet_db::open_memory().expect("open");
        let created =
            IdentityManager::load_or_create(&conn, "hunter2", "alice", 1000).expect("create");
        let reloaded =
            IdentityManager::load_or_create(&conn, "hunter2", "ignored", 2000).expect("reload");

        assert_eq!(created.public_key(), reloaded.public_key());
        assert_eq!(reloaded.nickname(), "alice");
        assert_eq!(reloaded.identity().created_at, 1000);
    }

    #[test]
    fn test_wrong_passphrase_is_locked() {
        let conn = ordernet_db::open_memory().expect("open");
        IdentityManager::load_or_create(&conn, "correct", "alice", 1000).expect("create");

        let result = IdentityManager::load_or_create(&conn, "wrong", "alice", 2000);
        assert!(matches!(result, Err(NodeError::IdentityLocked)));
    }

    #[test]
    fn test_default_passphrase_roundtrip() {
        let conn = ordernet_db::open_memory().expect("open");
        let pass = ordernet_types::DEFAULT_PASSPHRASE;
        let created = IdentityManager::load_or_create(&conn, pass, "bob", 1).expect("create");
        let reloaded = IdentityManager::load_or_create(&conn, pass, "bob", 2).expect("reload");
        assert_eq!(created.public_key(), reloaded.public_key());
    }

    #[test]
    fn test_set_nickname_persists() {
        let conn = ordernet_db::open_memory().expect("open");
        let mut mgr =
            IdentityManager::load_or_create(&conn, "pass", "alice", 1000).expect("create");
        mgr.set_nickname(&conn, "alice-2").expect("update");
        assert_eq!(mgr.nickname(), "alice-2");

        let reloaded =
            IdentityManager::load_or_create(&conn, "pass", "ignored", 2000).expect("reload");
        assert_eq!(reloaded.nickname(), "alice-2");
    }

    #[test]
    fn test_private_key_is_not_stored_in_clear() {
        let conn = ordernet_db::open_memory().expect("open");
        let mgr = IdentityManager::load_or_create(&conn, "pass", "alice", 1000).expect("create");
        let row = ordernet_db::queries::identity::get(&conn)
            .expect("get")
            .expect("row");
        assert_ne!(
            row.encrypted_private_key,
            mgr.signing_key().to_bytes().to_vec()
        );
        assert_eq!(row.public_key, mgr.public_key().to_vec());
    }
}
