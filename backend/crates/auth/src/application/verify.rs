//! Verify Credentials Use Case
//!
//! The login core: looks up the account, runs the lockout state machine
//! around a constant-time secret comparison and persists the result.
//! Unknown user names are registered with the submitted secret.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::keyed_lock::KeyedMutex;

use crate::application::config::AuthConfig;
use crate::domain::entity::account::Account;
use crate::domain::lockout::{Attempt, Decision, LockoutPolicy};
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{
    secret::{StoredSecret, SubmittedSecret},
    user_name::UserName,
};
use crate::error::AuthResult;

/// Raw login form values
pub struct VerifyInput {
    pub user_name: String,
    pub secret: String,
}

/// Proof of a successful verification, handed to session issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub user_name: UserName,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// `first_contact` is set when the account was created by this attempt.
    Success {
        grant: SessionGrant,
        first_contact: bool,
    },
    Rejected {
        failed_attempts: u32,
        remaining: u32,
    },
    /// Refused without comparing the secret
    Locked { until: DateTime<Utc> },
    /// This attempt reached the threshold
    LockedNow { until: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct VerifyOutput {
    pub outcome: VerifyOutcome,
    /// Account as stored after this attempt
    pub account: Account,
}

pub struct VerifyCredentialsUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    policy: LockoutPolicy,
    locks: Arc<KeyedMutex<UserName>>,
}

impl<R> VerifyCredentialsUseCase<R>
where
    R: AccountRepository,
{
    /// `locks` must be shared by every use case instance over the same store.
    pub fn new(
        repo: Arc<R>,
        config: Arc<AuthConfig>,
        locks: Arc<KeyedMutex<UserName>>,
    ) -> AuthResult<Self> {
        let policy = config.lockout_policy()?;
        Ok(Self {
            repo,
            config,
            policy,
            locks,
        })
    }

    /// Evaluate one login attempt at `now`.
    ///
    /// Errors only on invalid input (nothing touched) and on storage
    /// failures. `AuthError::StorageConflict` means another writer got in
    /// between; the attempt had no effect and may be retried.
    pub async fn execute(&self, input: VerifyInput, now: DateTime<Utc>) -> AuthResult<VerifyOutput> {
        let user_name = UserName::new(input.user_name)?;
        let secret = SubmittedSecret::new(input.secret)?;

        let _guard = self.locks.lock(&user_name).await;

        match self.repo.get(&user_name).await? {
            None => self.register(user_name, &secret, now).await,
            Some(account) => self.attempt(account, &secret, now).await,
        }
    }

    async fn register(
        &self,
        user_name: UserName,
        secret: &SubmittedSecret,
        now: DateTime<Utc>,
    ) -> AuthResult<VerifyOutput> {
        let stored = StoredSecret::derive(secret, self.config.pepper(), self.config.hashing_cost)?;
        let mut account = Account::register(user_name, stored, now);

        self.repo.put(&account).await?;
        account.mark_stored();

        tracing::info!(user_name = %account.user_name, "Account registered on first login");

        Ok(VerifyOutput {
            outcome: VerifyOutcome::Success {
                grant: SessionGrant {
                    user_name: account.user_name.clone(),
                    issued_at: now,
                },
                first_contact: true,
            },
            account,
        })
    }

    async fn attempt(
        &self,
        mut account: Account,
        secret: &SubmittedSecret,
        now: DateTime<Utc>,
    ) -> AuthResult<VerifyOutput> {
        let pepper = self.config.pepper();
        let (next, decision) = self.policy.transition(&account.attempts, now, || {
            if account.secret.matches(secret, pepper) {
                Attempt::Matched
            } else {
                Attempt::Mismatched
            }
        });

        let outcome = match decision {
            Decision::Locked { until } => {
                // Nothing changed, nothing to write
                tracing::info!(
                    user_name = %account.user_name,
                    locked_until = %until,
                    "Login refused, account locked"
                );
                return Ok(VerifyOutput {
                    outcome: VerifyOutcome::Locked { until },
                    account,
                });
            }
            Decision::Accepted => VerifyOutcome::Success {
                grant: SessionGrant {
                    user_name: account.user_name.clone(),
                    issued_at: now,
                },
                first_contact: false,
            },
            Decision::Rejected {
                failed_attempts,
                remaining,
            } => VerifyOutcome::Rejected {
                failed_attempts,
                remaining,
            },
            Decision::LockedNow { until } => VerifyOutcome::LockedNow { until },
        };

        account.record_attempt(next, now);
        self.repo.put(&account).await?;
        account.mark_stored();

        match &outcome {
            VerifyOutcome::Success { .. } => {
                tracing::info!(user_name = %account.user_name, "Login succeeded");
            }
            VerifyOutcome::Rejected {
                failed_attempts, ..
            } => {
                tracing::info!(
                    user_name = %account.user_name,
                    failed_attempts,
                    "Login rejected"
                );
            }
            VerifyOutcome::LockedNow { until } => {
                tracing::warn!(
                    user_name = %account.user_name,
                    failed_attempts = account.failed_attempts(),
                    locked_until = %until,
                    "Account locked after too many failed attempts"
                );
            }
            VerifyOutcome::Locked { .. } => {}
        }

        Ok(VerifyOutput { outcome, account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::AccountRepository;
    use crate::error::AuthError;
    use crate::infra::memory::InMemoryAuthRepository;
    use chrono::{Duration, TimeZone};
    use platform::password::HashingCost;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn config(max: u32, timeout_secs: u64) -> AuthConfig {
        AuthConfig {
            max_failed_attempts: max,
            login_timeout: std::time::Duration::from_secs(timeout_secs),
            hashing_cost: HashingCost::minimal(),
            ..AuthConfig::development()
        }
    }

    fn use_case(
        repo: &InMemoryAuthRepository,
        config: AuthConfig,
    ) -> VerifyCredentialsUseCase<InMemoryAuthRepository> {
        VerifyCredentialsUseCase::new(
            Arc::new(repo.clone()),
            Arc::new(config),
            Arc::new(KeyedMutex::new()),
        )
        .unwrap()
    }

    fn input(name: &str, secret: &str) -> VerifyInput {
        VerifyInput {
            user_name: name.to_string(),
            secret: secret.to_string(),
        }
    }

    async fn stored(repo: &InMemoryAuthRepository, name: &str) -> Option<Account> {
        repo.get(&UserName::new(name).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_contact_registers_account() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(3, 300));

        let out = verifier.execute(input("alice", "s3cret"), t0()).await.unwrap();

        match &out.outcome {
            VerifyOutcome::Success {
                grant,
                first_contact,
            } => {
                assert!(*first_contact);
                assert_eq!(grant.user_name.as_str(), "alice");
                assert_eq!(grant.issued_at, t0());
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let account = stored(&repo, "alice").await.unwrap();
        assert_eq!(account.failed_attempts(), 0);
        assert_eq!(account.locked_until(), None);
        assert_eq!(account.version, 1);
        let submitted = SubmittedSecret::new("s3cret".to_string()).unwrap();
        assert!(account.secret.matches(&submitted, None));
    }

    #[tokio::test]
    async fn test_lockout_scenario() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(3, 300));
        let now = t0();

        let out = verifier.execute(input("bob", "right"), now).await.unwrap();
        assert!(matches!(
            out.outcome,
            VerifyOutcome::Success {
                first_contact: true,
                ..
            }
        ));

        let out = verifier.execute(input("bob", "wrong"), now).await.unwrap();
        assert_eq!(
            out.outcome,
            VerifyOutcome::Rejected {
                failed_attempts: 1,
                remaining: 2
            }
        );

        let out = verifier.execute(input("bob", "wrong"), now).await.unwrap();
        assert_eq!(
            out.outcome,
            VerifyOutcome::Rejected {
                failed_attempts: 2,
                remaining: 1
            }
        );

        let until = now + Duration::seconds(300);
        let out = verifier.execute(input("bob", "wrong"), now).await.unwrap();
        assert_eq!(out.outcome, VerifyOutcome::LockedNow { until });
        assert_eq!(out.account.failed_attempts(), 3);
        assert_eq!(out.account.locked_until(), Some(until));

        // Correct secret does not help while locked
        let later = now + Duration::seconds(10);
        let out = verifier.execute(input("bob", "right"), later).await.unwrap();
        assert_eq!(out.outcome, VerifyOutcome::Locked { until });
        assert_eq!(stored(&repo, "bob").await.unwrap().failed_attempts(), 3);

        let after = now + Duration::seconds(301);
        let out = verifier.execute(input("bob", "right"), after).await.unwrap();
        assert!(matches!(
            out.outcome,
            VerifyOutcome::Success {
                first_contact: false,
                ..
            }
        ));

        let account = stored(&repo, "bob").await.unwrap();
        assert_eq!(account.failed_attempts(), 0);
        assert_eq!(account.locked_until(), None);
        assert_eq!(account.attempts.last_attempt, Some(after));
    }

    #[tokio::test]
    async fn test_locked_attempt_leaves_storage_untouched() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(1, 60));

        verifier.execute(input("carol", "right"), t0()).await.unwrap();
        verifier.execute(input("carol", "wrong"), t0()).await.unwrap();
        let before = stored(&repo, "carol").await.unwrap();

        let out = verifier.execute(input("carol", "wrong"), t0()).await.unwrap();
        assert!(matches!(out.outcome, VerifyOutcome::Locked { .. }));

        let after = stored(&repo, "carol").await.unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(after.attempts, before.attempts);
    }

    #[tokio::test]
    async fn test_mismatch_after_expired_lock_relocks() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(2, 60));

        verifier.execute(input("dave", "right"), t0()).await.unwrap();
        verifier.execute(input("dave", "wrong"), t0()).await.unwrap();
        verifier.execute(input("dave", "wrong"), t0()).await.unwrap();

        let later = t0() + Duration::seconds(61);
        let out = verifier.execute(input("dave", "wrong"), later).await.unwrap();
        assert_eq!(
            out.outcome,
            VerifyOutcome::LockedNow {
                until: later + Duration::seconds(60)
            }
        );
        assert_eq!(out.account.failed_attempts(), 3);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(5, 60));

        verifier.execute(input("erin", "right"), t0()).await.unwrap();
        verifier.execute(input("erin", "wrong"), t0()).await.unwrap();
        verifier.execute(input("erin", "wrong"), t0()).await.unwrap();

        let out = verifier.execute(input("erin", "right"), t0()).await.unwrap();
        assert!(matches!(out.outcome, VerifyOutcome::Success { .. }));
        assert_eq!(out.account.failed_attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_storage() {
        let repo = InMemoryAuthRepository::new();
        let verifier = use_case(&repo, config(3, 300));

        let err = verifier.execute(input("", "secret"), t0()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        verifier.execute(input("frank", "right"), t0()).await.unwrap();
        let before = stored(&repo, "frank").await.unwrap();

        let err = verifier.execute(input("frank", ""), t0()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        let after = stored(&repo, "frank").await.unwrap();
        assert_eq!(after.version, before.version);
        assert_eq!(repo.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_pepper_is_applied() {
        let repo = InMemoryAuthRepository::new();
        let peppered = AuthConfig {
            password_pepper: Some(b"pepper".to_vec()),
            ..config(3, 300)
        };
        let verifier = use_case(&repo, peppered);
        verifier.execute(input("gina", "right"), t0()).await.unwrap();

        let account = stored(&repo, "gina").await.unwrap();
        let submitted = SubmittedSecret::new("right".to_string()).unwrap();
        assert!(account.secret.matches(&submitted, Some(b"pepper")));
        assert!(!account.secret.matches(&submitted, None));
    }

    #[tokio::test]
    async fn test_concurrent_mismatches_are_all_counted() {
        let repo = InMemoryAuthRepository::new();
        let verifier = Arc::new(use_case(&repo, config(10, 300)));
        verifier.execute(input("hank", "right"), t0()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let verifier = verifier.clone();
            handles.push(tokio::spawn(async move {
                verifier.execute(input("hank", "wrong"), t0()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let account = stored(&repo, "hank").await.unwrap();
        assert_eq!(account.failed_attempts(), 4);
        assert_eq!(account.version, 5);
    }

    /// Store whose revision always moves between read and write
    #[derive(Clone, Default)]
    struct RacingRepository {
        inner: InMemoryAuthRepository,
    }

    impl AccountRepository for RacingRepository {
        async fn get(&self, user_name: &UserName) -> AuthResult<Option<Account>> {
            self.inner.get(user_name).await
        }

        async fn put(&self, _account: &Account) -> AuthResult<()> {
            Err(AuthError::StorageConflict)
        }
    }

    #[tokio::test]
    async fn test_storage_conflict_is_surfaced() {
        let repo = RacingRepository::default();
        let verifier = VerifyCredentialsUseCase::new(
            Arc::new(repo.clone()),
            Arc::new(config(3, 300)),
            Arc::new(KeyedMutex::new()),
        )
        .unwrap();

        let err = verifier.execute(input("ivan", "pw"), t0()).await.unwrap_err();
        assert!(matches!(err, AuthError::StorageConflict));
        assert_eq!(repo.inner.account_count().await, 0);

        // Existing account: the attempt is not counted
        let existing = use_case(&repo.inner, config(3, 300));
        existing.execute(input("ivan", "pw"), t0()).await.unwrap();
        let err = verifier.execute(input("ivan", "wrong"), t0()).await.unwrap_err();
        assert!(matches!(err, AuthError::StorageConflict));
        let account = stored(&repo.inner, "ivan").await.unwrap();
        assert_eq!(account.failed_attempts(), 0);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_zero_threshold_is_invalid_config() {
        let repo = InMemoryAuthRepository::new();
        let result = VerifyCredentialsUseCase::new(
            Arc::new(repo),
            Arc::new(config(0, 300)),
            Arc::new(KeyedMutex::new()),
        );
        assert!(matches!(result, Err(AuthError::InvalidConfig(_))));
    }
}
