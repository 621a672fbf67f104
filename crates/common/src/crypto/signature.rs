//! HMAC-SHA256 message signatures encoded as standard base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while computing a signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The key was rejected by the MAC implementation
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Compute `base64(HMAC-SHA256(key, message))`.
///
/// Both inputs are taken as raw UTF-8 bytes. The output uses the standard
/// alphabet with padding.
///
/// ```
/// use storefront_common::crypto::hmac_sha256_base64;
///
/// let sig = hmac_sha256_base64("key", "The quick brown fox jumps over the lazy dog").unwrap();
/// assert_eq!(sig, "97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=");
/// ```
pub fn hmac_sha256_base64(key: &str, message: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rfc_4231_case_2() {
        // "Jefe" / "what do ya want for nothing?" from RFC 4231
        let sig = hmac_sha256_base64("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn output_is_padded_base64_of_32_bytes() {
        let sig = hmac_sha256_base64("secret", "01/01/2024 07:00:00").unwrap();
        assert_eq!(sig.len(), 44);
        assert!(sig.ends_with('='));
        assert_eq!(STANDARD.decode(&sig).unwrap().len(), 32);
    }

    #[test]
    fn empty_key_is_accepted() {
        assert!(hmac_sha256_base64("", "payload").is_ok());
    }
}
