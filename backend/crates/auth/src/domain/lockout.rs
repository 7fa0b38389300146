//! Account Lockout
//!
//! Per-account attempt tracking as an explicit two-state machine:
//!
//! ```text
//!              mismatch, count < max
//!             ┌──────────────┐
//!             ▼              │
//!        ┌──────────┐ ───────┘        ┌────────┐
//!  ────▶ │ Unlocked │ ──────────────▶ │ Locked │ ◀─┐ attempt before
//!        └──────────┘  mismatch,      └────────┘ ──┘ locked_until
//!             ▲        count reaches max    │
//!             └─────────────────────────────┘
//!                   locked_until elapsed
//! ```
//!
//! A match while unlocked always resets the counter and clears the lock.
//! The machine never does I/O; the caller loads and persists the state.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, AuthResult};

/// Attempt bookkeeping embedded in every account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptState {
    /// Consecutive mismatches since the last success
    pub failed_attempts: u32,
    /// Time of the most recent evaluated attempt
    pub last_attempt: Option<DateTime<Utc>>,
    /// Attempts are refused without comparison until this instant
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    Locked { until: DateTime<Utc> },
}

impl AttemptState {
    /// State of an account created by its first login
    pub fn registered(now: DateTime<Utc>) -> Self {
        Self {
            failed_attempts: 0,
            last_attempt: Some(now),
            locked_until: None,
        }
    }

    /// A lock whose deadline has passed counts as unlocked.
    pub fn status(&self, now: DateTime<Utc>) -> LockStatus {
        match self.locked_until {
            Some(until) if now < until => LockStatus::Locked { until },
            _ => LockStatus::Unlocked,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status(now), LockStatus::Locked { .. })
    }
}

/// Result of comparing the submitted secret with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Matched,
    Mismatched,
}

/// What the state machine decided for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected { failed_attempts: u32, remaining: u32 },
    /// Refused by an active lock; state is unchanged.
    Locked { until: DateTime<Utc> },
    /// This mismatch reached the threshold and started a lock.
    LockedNow { until: DateTime<Utc> },
}

/// Threshold and lock duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    login_timeout: Duration,
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, login_timeout: std::time::Duration) -> AuthResult<Self> {
        if max_failed_attempts == 0 {
            return Err(AuthError::InvalidConfig(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }
        let login_timeout = Duration::from_std(login_timeout)
            .map_err(|e| AuthError::InvalidConfig(format!("login_timeout out of range: {e}")))?;

        Ok(Self {
            max_failed_attempts,
            login_timeout,
        })
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    /// Apply one login attempt.
    ///
    /// `compare` is only invoked when the account is not locked, so a locked
    /// account never has its secret compared.
    pub fn transition(
        &self,
        state: &AttemptState,
        now: DateTime<Utc>,
        compare: impl FnOnce() -> Attempt,
    ) -> (AttemptState, Decision) {
        if let LockStatus::Locked { until } = state.status(now) {
            return (*state, Decision::Locked { until });
        }

        match compare() {
            Attempt::Matched => (AttemptState::registered(now), Decision::Accepted),
            Attempt::Mismatched => {
                // An expired lock does not reset the counter: counting resumes
                // from where it stopped.
                let failed_attempts = state.failed_attempts.saturating_add(1);

                if failed_attempts >= self.max_failed_attempts {
                    let until = now
                        .checked_add_signed(self.login_timeout)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    let next = AttemptState {
                        failed_attempts,
                        last_attempt: Some(now),
                        locked_until: Some(until),
                    };
                    (next, Decision::LockedNow { until })
                } else {
                    let next = AttemptState {
                        failed_attempts,
                        last_attempt: Some(now),
                        locked_until: None,
                    };
                    let remaining = self.max_failed_attempts - failed_attempts;
                    (
                        next,
                        Decision::Rejected {
                            failed_attempts,
                            remaining,
                        },
                    )
                }
            }
        }
    }
}
