//! Credential hashing collaborator.
//!
//! # Invariants
//! - Plain-text passwords never leave this module in logs or errors.
//! - Hashes use the bcrypt modular format, so `$2a$`/`$2b$` hashes produced by
//!   other bcrypt implementations verify unchanged.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Work factor used when no explicit cost is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Hashing collaborator failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialError(String);

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "credential hashing failed: {}", self.0)
    }
}

impl Error for CredentialError {}

/// One-way password hashing used by sign-up and login.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, CredentialError>;
    /// Returns `Ok(false)` for a well-formed hash that does not match.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError>;
}

/// bcrypt-backed hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Creates a hasher with the given work factor.
    ///
    /// # Errors
    /// - Returns an error when `cost` is outside bcrypt's `4..=31` range.
    pub fn try_new(cost: u32) -> Result<Self, CredentialError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(CredentialError(format!(
                "bcrypt cost {cost} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        bcrypt::hash(password, self.cost).map_err(|err| CredentialError(err.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        bcrypt::verify(password, hash).map_err(|err| CredentialError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{BcryptHasher, PasswordHasher};

    #[test]
    fn hash_then_verify() {
        let hasher = BcryptHasher::try_new(4).unwrap();
        let hash = hasher.hash("secret").unwrap();
        assert_ne!(hash, "secret");
        assert!(hasher.verify("secret", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn rejects_out_of_range_cost() {
        assert!(BcryptHasher::try_new(3).is_err());
        assert!(BcryptHasher::try_new(32).is_err());
        assert_eq!(BcryptHasher::default().cost(), 10);
    }

    #[test]
    fn verify_reports_malformed_hash_as_error() {
        let hasher = BcryptHasher::try_new(4).unwrap();
        assert!(hasher.verify("secret", "not-a-hash").is_err());
    }
}
