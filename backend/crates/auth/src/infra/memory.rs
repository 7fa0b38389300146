//! In-Memory Repository
//!
//! Process-local storage with the same revision checks as PostgreSQL. Used
//! by tests and when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::SessionId;
use tokio::sync::RwLock;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Store {
    /// Accounts as written, with `version` set to the stored revision
    accounts: HashMap<UserName, Account>,
    sessions: HashMap<SessionId, Session>,
}

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.store.read().await.accounts.len()
    }

    pub async fn session_count(&self) -> usize {
        self.store.read().await.sessions.len()
    }
}

impl AccountRepository for InMemoryAuthRepository {
    async fn get(&self, user_name: &UserName) -> AuthResult<Option<Account>> {
        Ok(self.store.read().await.accounts.get(user_name).cloned())
    }

    async fn put(&self, account: &Account) -> AuthResult<()> {
        let mut store = self.store.write().await;

        let current = store
            .accounts
            .get(&account.user_name)
            .map_or(0, |stored| stored.version);
        if current != account.version {
            return Err(AuthError::StorageConflict);
        }

        let mut stored = account.clone();
        stored.version += 1;
        store.accounts.insert(stored.user_name.clone(), stored);
        Ok(())
    }
}

impl SessionRepository for InMemoryAuthRepository {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        self.store
            .write()
            .await
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>> {
        Ok(self.store.read().await.sessions.get(&session_id).cloned())
    }

    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        if let Some(session) = self.store.write().await.sessions.get_mut(&session_id) {
            session.touch(at);
        }
        Ok(())
    }

    async fn delete(&self, session_id: SessionId) -> AuthResult<()> {
        self.store.write().await.sessions.remove(&session_id);
        Ok(())
    }

    async fn cleanup_idle(&self, before: DateTime<Utc>) -> AuthResult<u64> {
        let mut store = self.store.write().await;
        let count = store.sessions.len();
        store
            .sessions
            .retain(|_, session| session.last_activity_at >= before);
        let deleted = (count - store.sessions.len()) as u64;

        tracing::info!(sessions_deleted = deleted, "Cleaned up idle auth sessions");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::secret::{StoredSecret, SubmittedSecret};
    use chrono::{Duration, TimeZone};
    use platform::password::HashingCost;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn account(name: &str) -> Account {
        let secret = SubmittedSecret::new("pw".to_string()).unwrap();
        let stored = StoredSecret::derive(&secret, None, HashingCost::minimal()).unwrap();
        Account::register(UserName::new(name).unwrap(), stored, t0())
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let repo = InMemoryAuthRepository::new();
        let account = account("alice");
        repo.put(&account).await.unwrap();

        let loaded = repo.get(&account.user_name).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.user_name, account.user_name);
        assert_eq!(loaded.secret, account.secret);
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let repo = InMemoryAuthRepository::new();
        let account = account("bob");
        repo.put(&account).await.unwrap();

        // Second registration of the same name
        assert!(matches!(
            repo.put(&account).await,
            Err(AuthError::StorageConflict)
        ));

        let first = repo.get(&account.user_name).await.unwrap().unwrap();
        let second = first.clone();
        repo.put(&first).await.unwrap();
        assert!(matches!(
            repo.put(&second).await,
            Err(AuthError::StorageConflict)
        ));
        assert_eq!(
            repo.get(&account.user_name).await.unwrap().unwrap().version,
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_account_is_none() {
        let repo = InMemoryAuthRepository::new();
        let name = UserName::new("nobody").unwrap();
        assert!(repo.get(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let repo = InMemoryAuthRepository::new();
        let session = Session::new(UserName::new("carol").unwrap(), t0());
        repo.create(&session).await.unwrap();

        let later = t0() + Duration::seconds(30);
        repo.touch(session.session_id, later).await.unwrap();
        let loaded = repo.find_by_id(session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.last_activity_at, later);

        repo.delete(session.session_id).await.unwrap();
        assert!(repo.find_by_id(session.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_idle() {
        let repo = InMemoryAuthRepository::new();
        let stale = Session::new(UserName::new("old").unwrap(), t0());
        let fresh = Session::new(UserName::new("new").unwrap(), t0() + Duration::hours(2));
        repo.create(&stale).await.unwrap();
        repo.create(&fresh).await.unwrap();

        let deleted = repo.cleanup_idle(t0() + Duration::hours(1)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo.find_by_id(fresh.session_id).await.unwrap().is_some());
    }
}
