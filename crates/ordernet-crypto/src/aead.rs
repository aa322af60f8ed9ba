//! XChaCha20-Poly1305 AEAD encryption.
//!
//! Covers chat payloads under channel group keys, the encrypted group key in
//! key-exchange payloads, and the identity private key at rest. The extended
//! 24-byte nonce is drawn fresh from the OS RNG for every encryption.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};

use crate::{CryptoError, Result};

/// Nonce size for XChaCha20-Poly1305 (192 bits = 24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Key size for XChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt data with XChaCha20-Poly1305.
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `nonce` - 24-byte nonce (must never be reused with the same key)
/// * `plaintext` - Data to encrypt
/// * `aad` - Additional authenticated data (not encrypted, but authenticated)
///
/// # Returns
///
/// Ciphertext with appended 16-byte authentication tag.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = XNonce::from_slice(nonce);

    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Decrypt data with XChaCha20-Poly1305.
///
/// Returns the plaintext, or [`CryptoError::AeadDecryption`] if the
/// authentication tag does not verify.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = XNonce::from_slice(nonce);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AeadDecryption)
}

/// Encrypt data without additional authenticated data.
pub fn encrypt_no_aad(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    encrypt(key, nonce, plaintext, &[])
}

/// Decrypt data without additional authenticated data.
pub fn decrypt_no_aad(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    decrypt(key, nonce, ciphertext, &[])
}

/// Sample a fresh random 24-byte nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut nonce);
    nonce
}

/// Sample a fresh random 32-byte key.
pub fn generate_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];
        let plaintext = b"hello #general";
        let aad = b"associated data";

        let ciphertext = encrypt(&key, &nonce, plaintext, aad).expect("encrypt");
        let decrypted = decrypt(&key, &nonce, &ciphertext, aad).expect("decrypt");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_no_aad_roundtrip() {
        let key = generate_key();
        let nonce = generate_nonce();
        let plaintext = b"group key bytes";

        let ciphertext = encrypt_no_aad(&key, &nonce, plaintext).expect("encrypt");
        let decrypted = decrypt_no_aad(&key, &nonce, &ciphertext).expect("decrypt");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_ciphertext_has_tag() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];
        let plaintext = b"test";

        let ciphertext = encrypt_no_aad(&key, &nonce, plaintext).expect("encrypt");
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = [0x01u8; KEY_SIZE];
        let key2 = [0x02u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let ciphertext = encrypt_no_aad(&key1, &nonce, b"test").expect("encrypt");
        assert!(decrypt_no_aad(&key2, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [0x01u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let mut ciphertext = encrypt_no_aad(&key, &nonce, b"test").expect("encrypt");
        if let Some(byte) = ciphertext.first_mut() {
            *byte ^= 0xFF;
        }
        assert!(decrypt_no_aad(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let key = [0x05u8; KEY_SIZE];
        let nonce = [0x06u8; NONCE_SIZE];
        let ciphertext = encrypt_no_aad(&key, &nonce, b"short").expect("encrypt");

        for i in 0..ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = ciphertext.clone();
                tampered[i] ^= 1 << bit;
                assert!(
                    decrypt_no_aad(&key, &nonce, &tampered).is_err(),
                    "flip of byte {i} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_nonce_generation_is_random() {
        assert_ne!(generate_nonce(), generate_nonce());
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let ciphertext = encrypt_no_aad(&key, &nonce, b"").expect("encrypt");
        assert_eq!(ciphertext.len(), TAG_SIZE);

        let decrypted = decrypt_no_aad(&key, &nonce, &ciphertext).expect("decrypt");
        assert!(decrypted.is_empty());
    }
}
