//! Establish Session Use Case
//!
//! Persists a session for a verified grant and returns the signed cookie
//! token.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session_token;
use crate::application::verify::SessionGrant;
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

pub struct EstablishSessionOutput {
    pub session: Session,
    pub token: String,
}

pub struct EstablishSessionUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> EstablishSessionUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    pub async fn execute(&self, grant: SessionGrant) -> AuthResult<EstablishSessionOutput> {
        let session = Session::new(grant.user_name, grant.issued_at);
        let token = session_token::sign(&self.config.session_secret, session.session_id)?;

        self.session_repo.create(&session).await?;

        tracing::info!(
            session_id = %session.session_id,
            user_name = %session.user_name,
            "Session established"
        );

        Ok(EstablishSessionOutput { session, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::user_name::UserName;
    use crate::infra::memory::InMemoryAuthRepository;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_establish_stores_session_and_signs_token() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let config = Arc::new(AuthConfig::development());
        let use_case = EstablishSessionUseCase::new(repo.clone(), config.clone());

        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let out = use_case
            .execute(SessionGrant {
                user_name: UserName::new("alice").unwrap(),
                issued_at,
            })
            .await
            .unwrap();

        assert_eq!(out.session.issued_at, issued_at);
        assert_eq!(
            session_token::verify(&config.session_secret, &out.token).unwrap(),
            out.session.session_id
        );

        let stored = repo.find_by_id(out.session.session_id).await.unwrap().unwrap();
        assert_eq!(stored, out.session);
    }
}
