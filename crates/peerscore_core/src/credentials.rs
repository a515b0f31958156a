//! Salted password digests.
//!
//! Digest = `hex(sha256(salt ":" password))`, salt is a random UUID v4.
//! Plain passwords never leave this module and are never logged.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Stored password material for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: String,
    pub salt: String,
}

impl PasswordDigest {
    /// Derives a digest with a fresh random salt.
    pub fn derive(password: &str) -> Self {
        Self::with_salt(password, Uuid::new_v4().simple().to_string())
    }

    /// Derives a digest with a caller-provided salt.
    pub fn with_salt(password: &str, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        let hash = digest(&salt, password);
        Self { hash, salt }
    }

    /// Returns whether `password` matches this digest.
    pub fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.hash
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::PasswordDigest;

    #[test]
    fn verify_accepts_only_the_hashed_password() {
        let digest = PasswordDigest::derive("1234");
        assert!(digest.verify("1234"));
        assert!(!digest.verify("12345"));
        assert_eq!(digest.hash.len(), 64);
    }

    #[test]
    fn salts_differ_between_derivations() {
        let first = PasswordDigest::derive("same");
        let second = PasswordDigest::derive("same");
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn fixed_salt_is_reproducible() {
        let first = PasswordDigest::with_salt("pw", "salt");
        let second = PasswordDigest::with_salt("pw", "salt");
        assert_eq!(first, second);
    }
}
