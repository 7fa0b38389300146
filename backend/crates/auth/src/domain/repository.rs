//! Repository Traits
//!
//! Storage interfaces consumed by the application layer. Implementations
//! live in `infra/`.

use chrono::{DateTime, Utc};
use kernel::id::SessionId;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::value_object::user_name::UserName;
use crate::error::AuthResult;

/// Account storage with optimistic concurrency
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Look up an account by user name
    async fn get(&self, user_name: &UserName) -> AuthResult<Option<Account>>;

    /// Store `account` if the stored revision still equals `account.version`
    /// (absent counts as 0). The stored revision becomes `version + 1`.
    ///
    /// Returns `AuthError::StorageConflict` when the revision moved.
    async fn put(&self, account: &Account) -> AuthResult<()>;
}

/// Server-side session storage
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create(&self, session: &Session) -> AuthResult<()>;

    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>>;

    /// Record activity on a session
    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()>;

    async fn delete(&self, session_id: SessionId) -> AuthResult<()>;

    /// Delete sessions with no activity since `before`
    async fn cleanup_idle(&self, before: DateTime<Utc>) -> AuthResult<u64>;
}
