//! Session Entity
//!
//! Server-side login session. Created once the verifier accepts a login and
//! removed on logout or after sitting idle too long.

use chrono::{DateTime, Duration, Utc};
use kernel::id::SessionId;

use crate::domain::value_object::user_name::UserName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub user_name: UserName,
    pub issued_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_name: UserName, issued_at: DateTime<Utc>) -> Self {
        Self {
            session_id: SessionId::new(),
            user_name,
            issued_at,
            last_activity_at: issued_at,
        }
    }

    /// Idle for at least `idle_timeout` since the last request
    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity_at >= idle_timeout
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }
}
