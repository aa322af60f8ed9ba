//! # ordernet-crypto
//!
//! Cryptographic primitives for the OrderNet node.
//!
//! The suite is fixed — no algorithm negotiation happens anywhere in the
//! protocol:
//!
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)
//! - [`x25519`] — X25519 key agreement, plus Ed25519→X25519 conversion
//! - [`aead`] — XChaCha20-Poly1305 AEAD with 24-byte nonces
//! - [`argon2id`] — passphrase key derivation for the identity at rest
//! - [`kdf`] — HKDF-SHA256 for the group-key exchange
//! - [`fingerprint`] — lowercase hex helpers and short key fingerprints

pub mod aead;
pub mod argon2id;
pub mod ed25519;
pub mod fingerprint;
pub mod kdf;
pub mod x25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Argon2id hashing failed.
    #[error("argon2id error: {0}")]
    Argon2(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
