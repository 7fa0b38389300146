//! Auth Error Types
//!
//! Failures of the login core and its collaborators. Business outcomes of a
//! login attempt (rejected, locked) are NOT errors; see
//! [`crate::application::verify::VerifyOutcome`].

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Empty user name or secret. Nothing was read or written.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The account changed between read and write. Retry with fresh state.
    #[error("Account was modified concurrently")]
    StorageConflict,

    /// Session not found, idle for too long, or token forged
    #[error("Session not found or expired")]
    SessionInvalid,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] PasswordHashError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_) => ErrorKind::BadRequest,
            AuthError::StorageConflict => ErrorKind::Conflict,
            AuthError::SessionInvalid => ErrorKind::Unauthorized,
            AuthError::InvalidConfig(_)
            | AuthError::PasswordHash(_)
            | AuthError::Database(_)
            | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Internal details stay in the logs
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::StorageConflict => AppError::conflict(self.to_string())
                .with_action("Please try again"),
            AuthError::InvalidInput(_) | AuthError::SessionInvalid => {
                AppError::new(self.kind(), self.to_string())
            }
            _ => AppError::internal("Internal server error"),
        }
    }

    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::PasswordHash(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            AuthError::InvalidConfig(msg) | AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::StorageConflict => {
                tracing::warn!("Account update conflict was not resolved by retries");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        match self {
            // Database outages surface as 503 rather than 500
            AuthError::Database(e) => AppError::from(e).into_response(),
            other => other.to_app_error().into_response(),
        }
    }
}
