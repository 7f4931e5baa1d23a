use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password does not match")]
    Mismatch,

    #[error("stored password hash is unusable: {0}")]
    InvalidHash(String),

    #[error("failed to hash password: {0}")]
    Hashing(String),
}

/// Hash with Argon2id (default parameters) and a fresh random salt.
/// Returns a PHC string suitable for storage.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// The only password check in the service: every route that asks for a
/// site password goes through here.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("pw1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "pw1").is_ok());
    }

    #[test]
    fn different_password_is_a_mismatch() {
        let hash = hash_password("pw1").unwrap();
        assert!(matches!(verify_password(&hash, "pw2"), Err(PasswordError::Mismatch)));
        assert!(matches!(verify_password(&hash, ""), Err(PasswordError::Mismatch)));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn raw_hash_is_not_accepted_as_password() {
        let hash = hash_password("pw1").unwrap();
        assert!(verify_password(&hash, &hash).is_err());
    }

    #[test]
    fn garbage_hash_is_not_a_mismatch() {
        assert!(matches!(
            verify_password("not-a-phc-string", "pw1"),
            Err(PasswordError::InvalidHash(_))
        ));
    }
}
