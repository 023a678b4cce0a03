//! Password hashing for the in-memory identity store (argon2id, PHC strings).

use std::sync::OnceLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Hash `password` with a fresh salt into a PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    // UUIDv7 carries 74 random bits, enough for a per-record salt.
    let salt = SaltString::encode_b64(Uuid::now_v7().as_bytes())
        .map_err(|e| PasswordError(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a stored PHC string.
///
/// An unparsable stored hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash with the same parameters as real records, built on first use.
fn decoy_hash() -> Option<&'static str> {
    DECOY_HASH
        .get_or_init(|| hash_password("storefront-decoy").ok())
        .as_deref()
}

/// Check `password` against `stored`, or against the decoy hash when there
/// is no usable record.
///
/// Unknown and disabled users cost the same argon2 work as a wrong
/// password, so response time does not reveal which usernames exist.
pub fn check_password(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => verify_password(password, stored),
        None => {
            if let Some(decoy) = decoy_hash() {
                let _ = verify_password(password, decoy);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let stored = hash_password("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("Correct horse", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password("pw", "plaintext-pw"));
    }

    #[test]
    fn decoy_is_a_real_hash_and_never_matches() {
        let decoy = decoy_hash().unwrap();
        assert!(PasswordHash::new(decoy).is_ok());
        assert!(!check_password("storefront-decoy", None));
        assert!(!check_password("anything", None));

        let stored = hash_password("pw").unwrap();
        assert!(check_password("pw", Some(&stored)));
        assert!(!check_password("nope", Some(&stored)));
    }
}
