//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::SessionId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::lockout::AttemptState;
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::{secret::StoredSecret, user_name::UserName};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgAuthRepository {
    async fn get(&self, user_name: &UserName) -> AuthResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT
                user_name,
                secret_hash,
                failed_attempts,
                last_attempt_at,
                locked_until,
                version,
                created_at,
                updated_at
            FROM accounts
            WHERE user_name = $1
            "#,
        )
        .bind(user_name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn put(&self, account: &Account) -> AuthResult<()> {
        let failed_attempts = i32::try_from(account.failed_attempts())
            .map_err(|_| AuthError::Internal("failed_attempts out of range".to_string()))?;

        let affected = if account.is_new() {
            sqlx::query(
                r#"
                INSERT INTO accounts (
                    user_name,
                    secret_hash,
                    failed_attempts,
                    last_attempt_at,
                    locked_until,
                    version,
                    created_at,
                    updated_at
                ) VALUES ($1, $2, $3, $4, $5, 1, $6, $7)
                ON CONFLICT (user_name) DO NOTHING
                "#,
            )
            .bind(account.user_name.as_str())
            .bind(account.secret.as_phc_string())
            .bind(failed_attempts)
            .bind(account.attempts.last_attempt)
            .bind(account.locked_until())
            .bind(account.created_at)
            .bind(account.updated_at)
            .execute(&self.pool)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                r#"
                UPDATE accounts
                SET
                    secret_hash = $2,
                    failed_attempts = $3,
                    last_attempt_at = $4,
                    locked_until = $5,
                    updated_at = $6,
                    version = version + 1
                WHERE user_name = $1 AND version = $7
                "#,
            )
            .bind(account.user_name.as_str())
            .bind(account.secret.as_phc_string())
            .bind(failed_attempts)
            .bind(account.attempts.last_attempt)
            .bind(account.locked_until())
            .bind(account.updated_at)
            .bind(account.version)
            .execute(&self.pool)
            .await?
            .rows_affected()
        };

        if affected == 0 {
            return Err(AuthError::StorageConflict);
        }
        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (
                session_id,
                user_name,
                issued_at,
                last_activity_at
            ) VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.user_name.as_str())
        .bind(session.issued_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT
                session_id,
                user_name,
                issued_at,
                last_activity_at
            FROM auth_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        // GREATEST keeps concurrent requests from moving activity backwards
        sqlx::query(
            r#"
            UPDATE auth_sessions
            SET last_activity_at = GREATEST(last_activity_at, $2)
            WHERE session_id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, session_id: SessionId) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cleanup_idle(&self, before: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE last_activity_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up idle auth sessions");

        Ok(deleted)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    user_name: String,
    secret_hash: String,
    failed_attempts: i32,
    last_attempt_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> AuthResult<Account> {
        let failed_attempts = u32::try_from(self.failed_attempts)
            .map_err(|_| AuthError::Internal("Negative failed_attempts in storage".to_string()))?;

        Ok(Account {
            user_name: UserName::from_db(self.user_name),
            secret: StoredSecret::from_phc_string(self.secret_hash)?,
            attempts: AttemptState {
                failed_attempts,
                last_attempt: self.last_attempt_at,
                locked_until: self.locked_until,
            },
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_name: String,
    issued_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            session_id: SessionId::from_uuid(self.session_id),
            user_name: UserName::from_db(self.user_name),
            issued_at: self.issued_at,
            last_activity_at: self.last_activity_at,
        }
    }
}
