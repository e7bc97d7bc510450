//! Opaque token values.
//!
//! The raw value is handed to the caller exactly once; the store only ever
//! sees its hash.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random token value
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_token_value() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw token value, hex-encoded.
///
/// This is the value stored as `token.token_hash`.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_value_is_url_safe() {
        let token = generate_token_value();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        // 32 bytes → 43 base64url chars.
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn token_values_are_unique() {
        assert_ne!(generate_token_value(), generate_token_value());
    }

    #[test]
    fn token_hash_is_deterministic_hex() {
        let h = hash_token("some-token");
        assert_eq!(h, hash_token("some-token"));
        assert_eq!(h.len(), 64);
        assert_ne!(h, hash_token("other-token"));
    }
}
