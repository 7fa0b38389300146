//! Secret Value Objects
//!
//! [`SubmittedSecret`] is what arrives with a login attempt.
//! [`StoredSecret`] is what the account keeps: a salted Argon2id derivation,
//! never the submitted text.

use std::fmt;

use platform::password::{ClearTextPassword, HashedPassword, HashingCost};

use crate::error::{AuthError, AuthResult};

/// Secret from a login attempt. Zeroized on drop, redacted in `Debug`.
pub struct SubmittedSecret(ClearTextPassword);

impl SubmittedSecret {
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|_| AuthError::InvalidInput("secret must not be empty"))
    }
}

impl fmt::Debug for SubmittedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubmittedSecret").field(&"[REDACTED]").finish()
    }
}

/// Stored credential in PHC string format
#[derive(Clone, PartialEq, Eq)]
pub struct StoredSecret(HashedPassword);

impl StoredSecret {
    /// Derive the stored form of a first-contact secret
    pub fn derive(
        secret: &SubmittedSecret,
        pepper: Option<&[u8]>,
        cost: HashingCost,
    ) -> AuthResult<Self> {
        Ok(Self(secret.0.hash_with_cost(pepper, cost)?))
    }

    /// Restore from storage
    pub fn from_phc_string(phc_string: impl Into<String>) -> AuthResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|_| AuthError::Internal("Invalid secret hash in storage".to_string()))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Constant-time check of a submitted secret against this one
    pub fn matches(&self, secret: &SubmittedSecret, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&secret.0, pepper)
    }
}

impl fmt::Debug for StoredSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoredSecret").field(&"[HASH]").finish()
    }
}
