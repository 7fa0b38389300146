//! User Name Value Object
//!
//! The account identity. Any non-empty string without NUL is accepted as-is:
//! the name a user types on first login is the name they own from then on.

use derive_more::Display;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct UserName(String);

impl UserName {
    pub fn new(raw: impl Into<String>) -> AuthResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(AuthError::InvalidInput("user name must not be empty"));
        }
        // PostgreSQL TEXT cannot store NUL
        if raw.contains('\0') {
            return Err(AuthError::InvalidInput("user name must not contain NUL"));
        }
        Ok(Self(raw))
    }

    /// Restore from storage (trusted)
    pub fn from_db(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
