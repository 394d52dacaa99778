//! Password hashing and verification.
//!
//! Passwords are stored as Argon2id PHC strings. Verification against an
//! unknown identifier still runs a full Argon2 comparison against a dummy
//! digest so response timing does not reveal whether the account exists.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Password policy check before hashing.
pub(super) fn valid_password(password: &str) -> bool {
    let length = password.chars().count();
    (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length)
}

/// Hash a password into a PHC string with a fresh random salt.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a password against a stored PHC string.
pub(super) fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Digest compared against when the identifier is unknown.
/// Keeps the unknown-account path as slow as a real mismatch.
pub(super) fn dummy_hash() -> Result<String> {
    hash_password("sesio-dummy-password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_password_enforces_length() {
        assert!(!valid_password("short"));
        assert!(valid_password("longenough"));
        assert!(!valid_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)));
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("hunter22hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22hunter22", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter22hunter22").unwrap();
        let second = hash_password("hunter22hunter22").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn verify_rejects_malformed_digest() {
        assert!(!verify_password("hunter22hunter22", "not-a-phc-string"));
    }

    #[test]
    fn dummy_hash_never_matches_user_input() {
        let dummy = dummy_hash().unwrap();
        assert!(!verify_password("hunter22hunter22", &dummy));
    }
}
