//! Value Object Module

pub mod secret;
pub mod user_name;
