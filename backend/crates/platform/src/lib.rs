//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the backend crates:
//! - Password derivation (Argon2id) and verification
//! - Constant-time comparison and secure random bytes
//! - Cookie helpers
//! - Per-key async mutual exclusion

pub mod cookie;
pub mod crypto;
pub mod keyed_lock;
pub mod password;
