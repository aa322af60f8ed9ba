//! X25519 key agreement (RFC 7748).
//!
//! The group-key exchange encrypts a channel key to a recipient's long-term
//! Ed25519 identity. Ed25519 keys are converted to Montgomery form here so a
//! single identity keypair serves both signing and ECDH:
//! the verifying key maps through the Edwards→Montgomery birational map, and
//! the signing key maps to the clamped scalar from the first 32 bytes of
//! SHA-512 over the seed, exactly as Ed25519 itself derives its scalar.

use curve25519_dalek::edwards::CompressedEdwardsY;
use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{ed25519, CryptoError, Result};

/// An X25519 static secret key.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct X25519StaticSecret {
    inner: StaticSecret,
}

/// An X25519 public key (Montgomery u-coordinate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X25519PublicKey {
    bytes: [u8; 32],
}

/// An X25519 shared secret.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret {
    bytes: [u8; 32],
}

impl X25519StaticSecret {
    /// Generate a new random static secret.
    pub fn random() -> Self {
        Self {
            inner: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Create from raw bytes (clamped on construction).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            inner: StaticSecret::from(bytes),
        }
    }

    /// Compute the corresponding public key.
    pub fn public_key(&self) -> X25519PublicKey {
        let pk = PublicKey::from(&self.inner);
        X25519PublicKey {
            bytes: pk.to_bytes(),
        }
    }

    /// Perform Diffie-Hellman key agreement.
    pub fn diffie_hellman(&self, their_public: &X25519PublicKey) -> SharedSecret {
        let pk = PublicKey::from(their_public.bytes);
        let shared = self.inner.diffie_hellman(&pk);
        SharedSecret {
            bytes: *shared.as_bytes(),
        }
    }
}

impl X25519PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.bytes
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl SharedSecret {
    /// Get the raw bytes of the shared secret.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// Perform an ephemeral X25519 key exchange against a recipient public key.
///
/// Returns `(ephemeral_public_key, shared_secret)`. The ephemeral secret is
/// consumed by the exchange and never leaves this function.
pub fn ephemeral_key_exchange(their_public: &X25519PublicKey) -> (X25519PublicKey, SharedSecret) {
    let secret = EphemeralSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    let pk = PublicKey::from(their_public.bytes);
    let shared = secret.diffie_hellman(&pk);

    (
        X25519PublicKey {
            bytes: public.to_bytes(),
        },
        SharedSecret {
            bytes: *shared.as_bytes(),
        },
    )
}

/// Convert an Ed25519 verifying key to its X25519 (Montgomery) form.
///
/// Fails if the Edwards point does not decompress, which only happens for
/// byte strings that were never valid Ed25519 public keys.
pub fn montgomery_from_ed25519(key: &ed25519::VerifyingKey) -> Result<X25519PublicKey> {
    let compressed = CompressedEdwardsY(key.to_bytes());
    let edwards = compressed
        .decompress()
        .ok_or_else(|| CryptoError::InvalidInput("ed25519 point does not decompress".into()))?;
    Ok(X25519PublicKey {
        bytes: edwards.to_montgomery().to_bytes(),
    })
}

/// Convert an Ed25519 signing key to an X25519 static secret.
///
/// Ed25519 hashes the seed with SHA-512 and clamps the first 32 bytes to get
/// its scalar; the same clamped scalar is the X25519 counterpart of
/// [`montgomery_from_ed25519`] on the public side.
pub fn x25519_secret_from_ed25519(key: &ed25519::SigningKey) -> X25519StaticSecret {
    let mut hasher = Sha512::new();
    hasher.update(key.to_bytes());
    let hash = hasher.finalize();

    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&hash[..32]);
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;

    X25519StaticSecret::from_bytes(scalar)
}
