//! Account Entity
//!
//! One per user name. Holds the stored secret and the lockout bookkeeping.
//! Created on first login, never deleted by the login core.

use chrono::{DateTime, Utc};

use crate::domain::lockout::AttemptState;
use crate::domain::value_object::{secret::StoredSecret, user_name::UserName};

#[derive(Debug, Clone)]
pub struct Account {
    pub user_name: UserName,
    pub secret: StoredSecret,
    pub attempts: AttemptState,
    /// Storage revision this value was read at; 0 means never stored.
    /// Storage rejects a write whose version is not the current one.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// First-contact registration
    pub fn register(user_name: UserName, secret: StoredSecret, now: DateTime<Utc>) -> Self {
        Self {
            user_name,
            secret,
            attempts: AttemptState::registered(now),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_new(&self) -> bool {
        self.version == 0
    }

    pub fn failed_attempts(&self) -> u32 {
        self.attempts.failed_attempts
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.attempts.locked_until
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.attempts.is_locked(now)
    }

    pub(crate) fn record_attempt(&mut self, attempts: AttemptState, now: DateTime<Utc>) {
        self.attempts = attempts;
        self.updated_at = now;
    }

    /// Called after a successful write
    pub(crate) fn mark_stored(&mut self) {
        self.version += 1;
    }
}
