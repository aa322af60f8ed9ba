//! Lowercase hex helpers and short key fingerprints.
//!
//! Public keys travel as lowercase hex in allowlists, invite codes, and the
//! event stream. The fingerprint form `<first-8>..<last-4>` is what UIs show
//! next to nicknames.

use crate::{CryptoError, Result};

/// Encode a 32-byte public key as lowercase hex.
pub fn encode_key(key: &[u8; 32]) -> String {
    hex::encode(key)
}

/// Decode a lowercase-hex 32-byte public key.
pub fn decode_key(s: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })
}

/// Short human-readable form of a public key: `<first-8>..<last-4>` of the
/// hex encoding.
pub fn fingerprint(key: &[u8; 32]) -> String {
    let h = hex::encode(key);
    format!("{}..{}", &h[..8], &h[h.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_lowercase() {
        let encoded = encode_key(&[0xAB; 32]);
        assert_eq!(encoded, encoded.to_lowercase());
        assert_eq!(encoded.len(), 64);
    }

    #[test]
    fn test_decode_roundtrip() {
        let key = [0x7fu8; 32];
        let decoded = decode_key(&encode_key(&key)).expect("decode");
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(
            decode_key("abcd"),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert!(decode_key("zz").is_err());
    }

    #[test]
    fn test_fingerprint_format() {
        let mut key = [0u8; 32];
        key[0] = 0x12;
        key[1] = 0x34;
        key[2] = 0x56;
        key[3] = 0x78;
        key[30] = 0xab;
        key[31] = 0xcd;
        assert_eq!(fingerprint(&key), "12345678..abcd");
    }
}
