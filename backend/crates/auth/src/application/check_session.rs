//! Check Session Use Case
//!
//! Resolves a cookie token to a live session and records activity on it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::AuthConfig;
use crate::application::session_token;
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

pub struct CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    /// Returns the session with `last_activity_at` moved to `now`.
    ///
    /// An idle session is deleted and reported as `SessionInvalid`.
    pub async fn execute(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Session> {
        let session_id = session_token::verify(&self.config.session_secret, token)?;

        let mut session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_idle(now, self.config.session_idle_timeout()?) {
            self.session_repo.delete(session_id).await?;
            tracing::info!(
                session_id = %session_id,
                user_name = %session.user_name,
                "Idle session expired"
            );
            return Err(AuthError::SessionInvalid);
        }

        session.touch(now);
        self.session_repo
            .touch(session_id, session.last_activity_at)
            .await?;

        Ok(session)
    }
}
