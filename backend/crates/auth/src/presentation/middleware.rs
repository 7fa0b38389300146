//! Auth Middleware
//!
//! Guards routes that need a signed-in user.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use kernel::id::SessionId;

use crate::application::CheckSessionUseCase;
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::user_name::UserName;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// Signed-in user, stored in request extensions by [`require_session`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_name: UserName,
    pub session_id: SessionId,
}

/// Redirects to `/login` unless the request carries a live session
pub async fn require_session<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let Some(token) =
        platform::cookie::extract_cookie(req.headers(), &state.config.session_cookie_name)
    else {
        return Redirect::to("/login").into_response();
    };

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());
    match use_case.execute(&token, Utc::now()).await {
        Ok(session) => {
            req.extensions_mut().insert(CurrentUser {
                user_name: session.user_name,
                session_id: session.session_id,
            });
            next.run(req).await
        }
        Err(AuthError::SessionInvalid) => Redirect::to("/login").into_response(),
        Err(e) => e.into_response(),
    }
}
