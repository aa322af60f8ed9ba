//! Argon2id passphrase key derivation.
//!
//! Used once per node lifecycle: deriving the key that wraps the identity's
//! Ed25519 private half at rest. Parameters are fixed at t=3, m=64 MiB, p=1
//! with a 32-byte output; the 16-byte salt is stored next to the ciphertext.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::{CryptoError, Result};

/// Memory cost in KiB (64 MiB).
pub const M_COST: u32 = 65536;
/// Time cost (iterations).
pub const T_COST: u32 = 3;
/// Parallelism lanes.
pub const P_COST: u32 = 1;
/// Derived key length.
pub const OUTPUT_LEN: usize = 32;
/// Salt length.
pub const SALT_LEN: usize = 16;

/// Derive the identity-wrapping key from a passphrase and salt.
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<[u8; OUTPUT_LEN]> {
    derive_key_with_params(passphrase, salt, M_COST, T_COST, P_COST)
}

/// Derive a key with explicit Argon2id parameters.
///
/// Tests use reduced parameters; production callers go through
/// [`derive_key`].
pub fn derive_key_with_params(
    passphrase: &[u8],
    salt: &[u8],
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
) -> Result<[u8; OUTPUT_LEN]> {
    let params = Params::new(m_cost, t_cost, p_cost, Some(OUTPUT_LEN))
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; OUTPUT_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut output)
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    Ok(output)
}

/// Generate a random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = b"1234567890123456";
        let key1 = derive_key_with_params(b"passphrase", salt, 1024, 1, 1).expect("derive");
        let key2 = derive_key_with_params(b"passphrase", salt, 1024, 1, 1).expect("derive");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_different_passphrases_differ() {
        let salt = b"1234567890123456";
        let key1 = derive_key_with_params(b"pass1", salt, 1024, 1, 1).expect("derive");
        let key2 = derive_key_with_params(b"pass2", salt, 1024, 1, 1).expect("derive");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_different_salts_differ() {
        let key1 =
            derive_key_with_params(b"passphrase", b"salt111111111111", 1024, 1, 1).expect("derive");
        let key2 =
            derive_key_with_params(b"passphrase", b"salt222222222222", 1024, 1, 1).expect("derive");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_generate_salt() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();
        assert_ne!(salt1, salt2);
        assert_eq!(salt1.len(), SALT_LEN);
    }
}
