//! HKDF-SHA256 key derivation and channel-key derivation.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use crate::{CryptoError, Result};

/// Info string binding derived keys to the group-key exchange.
pub const KEYEX_INFO: &[u8] = b"ordernet-keyex";

/// Domain prefix for name-derived public channel keys.
const CHANNEL_KEY_DOMAIN: &[u8] = b"ordernet/channel-key/v1";

/// Derive the 32-byte wrapping key for a group-key exchange from an X25519
/// shared secret. No salt; info is [`KEYEX_INFO`].
pub fn derive_keyex_key(shared_secret: &[u8; 32]) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    hk.expand(KEYEX_INFO, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Derive the group key of a public channel from its id.
///
/// Public channels have no key distribution step: every node that joins
/// `#general` must land on the same key, so the key is a domain-separated
/// digest of the channel id. Private and DM channels never use this.
pub fn derive_channel_key(channel_id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(CHANNEL_KEY_DOMAIN);
    hasher.update(channel_id.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyex_key_is_deterministic() {
        let ss = [0x11u8; 32];
        let k1 = derive_keyex_key(&ss).expect("derive");
        let k2 = derive_keyex_key(&ss).expect("derive");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_keyex_key_depends_on_secret() {
        let k1 = derive_keyex_key(&[0x11u8; 32]).expect("derive");
        let k2 = derive_keyex_key(&[0x12u8; 32]).expect("derive");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_channel_key_is_deterministic() {
        assert_eq!(derive_channel_key("general"), derive_channel_key("general"));
        assert_ne!(derive_channel_key("general"), derive_channel_key("random"));
    }

    #[test]
    fn test_channel_key_is_not_a_bare_hash() {
        // The domain prefix must separate channel keys from a plain digest of
        // the id.
        let bare: [u8; 32] = Sha256::digest(b"general").into();
        assert_ne!(derive_channel_key("general"), bare);
    }
}
