//! HTTP Handlers

use axum::Json;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use kernel::error::app_error::AppError;
use std::sync::Arc;

use platform::keyed_lock::KeyedMutex;

use crate::application::config::AuthConfig;
use crate::application::{
    CheckSessionUseCase, EstablishSessionUseCase, SignOutUseCase, VerifyCredentialsUseCase,
    VerifyInput, VerifyOutcome, VerifyOutput,
};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{LoginForm, SessionStatusResponse};

/// Verification runs at most this many times per request when another
/// writer keeps winning the race on the same account.
pub(crate) const MAX_CONFLICT_RETRIES: usize = 3;

pub const LOCKED_MESSAGE: &str = "Account is temporarily locked. Please try again later.";
pub const LOCKED_NOW_MESSAGE: &str = "Too many failed attempts. Account is temporarily locked.";

/// Shared state for auth handlers
pub struct AuthAppState<R>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    /// Per-user-name serialisation of login attempts
    pub locks: Arc<KeyedMutex<UserName>>,
}

impl<R> AuthAppState<R>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    pub fn new(repo: R, config: AuthConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            locks: Arc::new(KeyedMutex::new()),
        }
    }
}

// Manual impl: `R` itself is only held behind an `Arc`.
impl<R> Clone for AuthAppState<R>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            locks: self.locks.clone(),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// GET /login
pub async fn login_form() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head><title>Login</title></head>
<body>
<form action="/login" method="post">
<input id="name" name="name" placeholder="Name">
<input id="pwd" name="pwd" type="password" placeholder="Password">
<button type="submit">login</button>
</form>
</body>
</html>"#,
    )
}

/// POST /login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    Form(form): Form<LoginForm>,
) -> AuthResult<Response>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let output = match verify_with_retry(&state, form).await {
        Ok(output) => output,
        Err(AuthError::InvalidInput(reason)) => {
            tracing::debug!(reason, "Login with invalid field");
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => return Err(e),
    };

    match output.outcome {
        VerifyOutcome::Success { grant, .. } => {
            let session = EstablishSessionUseCase::new(state.repo.clone(), state.config.clone())
                .execute(grant)
                .await?;
            let cookie = state.config.session_cookie().build_set_cookie(&session.token);

            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
        }
        VerifyOutcome::Rejected { .. } => Ok(Redirect::to("/login").into_response()),
        VerifyOutcome::Locked { .. } => Ok(AppError::locked(LOCKED_MESSAGE).into_response()),
        VerifyOutcome::LockedNow { .. } => {
            Ok(AppError::locked(LOCKED_NOW_MESSAGE).into_response())
        }
    }
}

async fn verify_with_retry<R>(state: &AuthAppState<R>, form: LoginForm) -> AuthResult<VerifyOutput>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let use_case = VerifyCredentialsUseCase::new(
        state.repo.clone(),
        state.config.clone(),
        state.locks.clone(),
    )?;

    let mut attempt = 1;
    loop {
        let input = VerifyInput {
            user_name: form.name.clone(),
            secret: form.pwd.clone(),
        };
        match use_case.execute(input, Utc::now()).await {
            Err(AuthError::StorageConflict) if attempt < MAX_CONFLICT_RETRIES => {
                tracing::debug!(attempt, "Account changed during login, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

// ============================================================================
// Logout
// ============================================================================

/// GET /logout
pub async fn logout<R>(State(state): State<AuthAppState<R>>, headers: HeaderMap) -> Response
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let cookie = state.config.session_cookie();

    if let Some(token) = platform::cookie::extract_cookie(&headers, &cookie.name) {
        let use_case = SignOutUseCase::new(state.repo.clone(), state.config.clone());
        // The cookie is cleared either way
        if let Err(e) = use_case.execute(&token).await {
            tracing::debug!(error = %e, "Sign out without a valid session");
        }
    }

    (
        [(header::SET_COOKIE, cookie.build_delete_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /session
pub async fn session_status<R>(
    State(state): State<AuthAppState<R>>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let Some(token) = platform::cookie::extract_cookie(&headers, &state.config.session_cookie_name)
    else {
        return Ok(Json(SessionStatusResponse::anonymous()));
    };

    let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());
    match use_case.execute(&token, Utc::now()).await {
        Ok(session) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            user_name: Some(session.user_name.to_string()),
            issued_at_ms: Some(session.issued_at.timestamp_millis()),
        })),
        Err(AuthError::SessionInvalid) => Ok(Json(SessionStatusResponse::anonymous())),
        Err(e) => Err(e),
    }
}
