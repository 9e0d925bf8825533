//! # Password Hashing
//!
//! Salted SHA-256 credentials for user accounts. Each password gets a
//! random salt; verification compares digests in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// A stored password credential.
///
/// Custom `Debug` redacts the digest to prevent credential leakage in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: String,
    digest: String,
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("salt", &self.salt)
            .field("digest", &"[REDACTED]")
            .finish()
    }
}

impl PasswordHash {
    /// Hash `password` with a fresh random salt.
    pub fn new(password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = salted_digest(&salt, password);
        Self { salt, digest }
    }

    /// Whether `password` matches this credential.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = salted_digest(&self.salt, password);
        candidate.as_bytes().ct_eq(self.digest.as_bytes()).into()
    }
}

/// Hex SHA-256 of `salt || password`.
fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}
