//! Administrative password checks for destructive actions.
//!
//! Only the hex SHA-256 digest of the password is ever configured.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Result, TrancheError};

/// Hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Whether `expected_sha256` is a well-formed hex SHA-256 digest.
pub fn is_valid_digest(expected_sha256: &str) -> bool {
    expected_sha256.len() == 64 && hex::decode(expected_sha256).is_ok()
}

/// Check `password` against a configured digest.
///
/// Fails with [`TrancheError::Unauthorized`] when no digest is configured or
/// the password does not match, and with [`TrancheError::Config`] when the
/// configured digest is not hex. Digests are compared in constant time.
pub fn verify_admin_password(password: &str, expected_sha256: Option<&str>) -> Result<()> {
    let expected = expected_sha256
        .map(str::trim)
        .filter(|digest| !digest.is_empty())
        .ok_or_else(|| {
            TrancheError::Unauthorized("no administrative password is configured".to_string())
        })?;

    let expected = hex::decode(expected).map_err(|_| {
        TrancheError::Config("administrative password digest is not hex SHA-256".to_string())
    })?;
    let actual = Sha256::digest(password.as_bytes());

    if bool::from(actual.as_slice().ct_eq(&expected)) {
        Ok(())
    } else {
        Err(TrancheError::Unauthorized(
            "incorrect administrative password".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_password_is_accepted() {
        let digest = hash_password("open sesame");
        assert!(is_valid_digest(&digest));
        assert!(verify_admin_password("open sesame", Some(&digest)).is_ok());
        assert!(verify_admin_password("open sesame", Some(&digest.to_uppercase())).is_ok());
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let digest = hash_password("open sesame");
        let err = verify_admin_password("open sesame!", Some(&digest)).unwrap_err();
        assert!(matches!(err, TrancheError::Unauthorized(_)));
    }

    #[test]
    fn test_missing_digest_refuses_everything() {
        assert!(verify_admin_password("", None).is_err());
        assert!(verify_admin_password("anything", Some("  ")).is_err());
    }

    #[test]
    fn test_malformed_digest_is_a_config_error() {
        let err = verify_admin_password("open sesame", Some("not-a-digest")).unwrap_err();
        assert!(matches!(err, TrancheError::Config(_)));
        let short = &hash_password("open sesame")[..32];
        assert!(matches!(
            verify_admin_password("open sesame", Some(short)),
            Err(TrancheError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_digest_validation() {
        assert!(!is_valid_digest("abc"));
        assert!(!is_valid_digest(&"z".repeat(64)));
    }
}
