//! Password Derivation and Verification
//!
//! Secrets are never stored as submitted. Each one is run through Argon2id
//! with a fresh random salt and stored as a PHC string; verification
//! re-derives from the submitted secret and compares the derived outputs in
//! constant time.
//!
//! ## Security Features
//! - Memory-hard hashing (Argon2id)
//! - Per-secret random salt, optional application-wide pepper
//! - Zeroization of clear text and peppered buffers
//! - Unicode NFKC normalization so equivalent inputs derive the same value

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Password policy violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password cannot be empty")]
    Empty,
}

/// Hashing/verification errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
}

// ============================================================================
// Hashing cost
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingCost {
    /// OWASP recommendation: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingCost {
    /// Minimal cost accepted by Argon2. Only for tests and local development.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordHashError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

// ============================================================================
// Clear Text Password (zeroized on drop)
// ============================================================================

/// Submitted secret, NFKC-normalized and zeroized on drop.
///
/// Not `Clone`, and `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize and accept any non-empty secret.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let raw = Zeroizing::new(raw);
        if raw.is_empty() {
            return Err(PasswordPolicyError::Empty);
        }
        Ok(Self(raw.nfkc().collect()))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = Zeroizing::new(self.as_bytes().to_vec());
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Derive a salted Argon2id PHC string
    pub fn hash_with_cost(
        &self,
        pepper: Option<&[u8]>,
        cost: HashingCost,
    ) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = cost
            .argon2()?
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (safe to store)
// ============================================================================

/// Argon2id derivation in PHC string format (algorithm, params, salt, output)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Load from storage
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Re-derive from `password` using the salt and parameters recorded in
    /// the PHC string and compare the outputs in constant time.
    ///
    /// A hash that no longer parses never verifies.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        // Parameters come from the PHC string, not from the default instance.
        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed_hash)
            .is_ok()
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(s: &str) -> ClearTextPassword {
        ClearTextPassword::new(s.to_string()).unwrap()
    }

    #[test]
    fn test_empty_is_rejected() {
        assert_eq!(
            ClearTextPassword::new(String::new()).unwrap_err(),
            PasswordPolicyError::Empty
        );
    }

    #[test]
    fn test_short_secrets_are_accepted() {
        assert!(ClearTextPassword::new("x".to_string()).is_ok());
        assert!(ClearTextPassword::new(" ".to_string()).is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hashed = pw("x").hash_with_cost(None, HashingCost::minimal()).unwrap();

        assert!(hashed.verify(&pw("x"), None));
        assert!(!hashed.verify(&pw("wrong"), None));
        assert!(!hashed.verify(&pw("X"), None));
    }

    #[test]
    fn test_phc_string_is_argon2id_and_salted() {
        let a = pw("same").hash_with_cost(None, HashingCost::minimal()).unwrap();
        let b = pw("same").hash_with_cost(None, HashingCost::minimal()).unwrap();

        assert!(a.as_phc_string().starts_with("$argon2id$"));
        assert!(!a.as_phc_string().contains("same"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_with_pepper() {
        let pepper = b"app-pepper";
        let hashed = pw("hunter2")
            .hash_with_cost(Some(pepper), HashingCost::minimal())
            .unwrap();

        assert!(hashed.verify(&pw("hunter2"), Some(pepper)));
        assert!(!hashed.verify(&pw("hunter2"), None));
        assert!(!hashed.verify(&pw("hunter2"), Some(b"other")));
    }

    #[test]
    fn test_nfkc_equivalent_inputs_verify() {
        // U+FB01 LATIN SMALL LIGATURE FI normalizes to "fi"
        let hashed = pw("\u{FB01}sh").hash_with_cost(None, HashingCost::minimal()).unwrap();
        assert!(hashed.verify(&pw("fish"), None));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let hashed = pw("stored").hash_with_cost(None, HashingCost::minimal()).unwrap();
        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&pw("stored"), None));
    }

    #[test]
    fn test_invalid_phc_string() {
        assert!(matches!(
            HashedPassword::from_phc_string("plaintext"),
            Err(PasswordHashError::InvalidHashFormat)
        ));
    }

    #[test]
    fn test_invalid_cost() {
        let cost = HashingCost {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        };
        assert!(matches!(
            pw("x").hash_with_cost(None, cost),
            Err(PasswordHashError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_debug_redaction() {
        let debug_output = format!("{:?}", pw("topsecret"));
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("topsecret"));

        let hashed = pw("topsecret").hash_with_cost(None, HashingCost::minimal()).unwrap();
        assert!(!format!("{:?}", hashed).contains("argon2"));
    }
}
