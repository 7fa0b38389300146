//! Auth Router

use axum::{Router, routing::get};

use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::presentation::handlers::{self, AuthAppState};

/// Login, logout and session status routes for any repository
pub fn auth_router<R>(state: AuthAppState<R>) -> Router
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/login",
            get(handlers::login_form).post(handlers::login::<R>),
        )
        .route("/logout", get(handlers::logout::<R>))
        .route("/session", get(handlers::session_status::<R>))
        .with_state(state)
}
