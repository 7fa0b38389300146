//! Shared Kernel
//!
//! Vocabulary that every backend crate agrees on:
//! - Unified error type ([`error::app_error::AppError`]) and its classification
//! - Typed identifiers
//!
//! Nothing in here knows about accounts, lockout or sessions.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
