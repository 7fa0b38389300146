//! Domain Layer
//!
//! Entities, value objects, the lockout state machine and repository traits.
//! No I/O happens here.

pub mod entity;
pub mod lockout;
pub mod repository;
pub mod value_object;

pub use entity::{account::Account, session::Session};
pub use lockout::{Attempt, AttemptState, Decision, LockStatus, LockoutPolicy};
pub use repository::{AccountRepository, SessionRepository};
