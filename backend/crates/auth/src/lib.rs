//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Accounts, sessions, the lockout state machine, repository traits
//! - `application/` - Use cases and configuration
//! - `infra/` - In-memory and PostgreSQL repositories
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Login model
//! - The first login for an unknown user name registers the account
//! - Consecutive failures lock the account for a fixed period; a locked
//!   account is refused without comparing secrets
//! - Secrets stored as salted Argon2id derivations
//! - Server-side sessions with HMAC-signed cookie tokens and idle expiry

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryAuthRepository, PgAuthRepository};
pub use presentation::{AuthAppState, CurrentUser, auth_router, require_session};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
