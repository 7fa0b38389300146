//! Application Layer
//!
//! Use cases orchestrating the domain and the repositories.

pub mod check_session;
pub mod config;
pub mod establish_session;
pub mod session_token;
pub mod sign_out;
pub mod verify;

// Re-exports
pub use check_session::CheckSessionUseCase;
pub use config::AuthConfig;
pub use establish_session::{EstablishSessionOutput, EstablishSessionUseCase};
pub use sign_out::SignOutUseCase;
pub use verify::{SessionGrant, VerifyCredentialsUseCase, VerifyInput, VerifyOutcome, VerifyOutput};
