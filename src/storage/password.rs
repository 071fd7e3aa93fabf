//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded standard base64, so a
//! hash keeps verifying after the configured iteration count changes.

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};

use super::db::StoreError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str, iterations: NonZeroU32) -> Result<String, StoreError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| StoreError::PasswordHash("system randomness unavailable".to_string()))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Constant-time check of `password` against an encoded hash. Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iterations() -> NonZeroU32 {
        NonZeroU32::new(1_000).unwrap()
    }

    #[test]
    fn test_hash_verifies() {
        let encoded = hash_password("p1", iterations()).unwrap();
        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("p1", &encoded));
        assert!(!verify_password("p2", &encoded));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same", iterations()).unwrap();
        let b = hash_password("same", iterations()).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_plaintext_and_malformed_never_verify() {
        assert!(!verify_password("p1", "p1"));
        assert!(!verify_password("p1", ""));
        assert!(!verify_password("p1", "pbkdf2-sha256$0$AAAA$AAAA"));
        assert!(!verify_password("p1", "pbkdf2-sha256$1000$!!$AAAA"));
        assert!(!verify_password("p1", "md5$1000$AAAA$AAAA$extra"));
    }
}
