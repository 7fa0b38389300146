//! Application Configuration
//!
//! Lockout thresholds, session behaviour and secrets for the auth layer.

use std::str::FromStr;
use std::time::Duration;

pub use platform::cookie::SameSite;
use platform::cookie::CookieConfig;
use platform::password::HashingCost;

use crate::domain::lockout::LockoutPolicy;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Consecutive mismatches that lock an account (`MAX_FAILED_ATTEMPTS`)
    pub max_failed_attempts: u32,
    /// How long a lock lasts (`LOGIN_TIMEOUT`)
    pub login_timeout: Duration,
    /// Sessions without activity for this long are dropped
    pub session_idle_timeout: Duration,
    pub session_cookie_name: String,
    /// HMAC key for session tokens (32 bytes)
    pub session_secret: [u8; 32],
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Application-wide secret mixed into every derivation
    pub password_pepper: Option<Vec<u8>>,
    pub hashing_cost: HashingCost,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            login_timeout: Duration::from_secs(15 * 60),
            session_idle_timeout: Duration::from_secs(12 * 3600),
            session_cookie_name: "todo_session".to_string(),
            session_secret: [0u8; 32],
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            hashing_cost: HashingCost::default(),
        }
    }
}

impl AuthConfig {
    /// Config with a random session secret
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_key(),
            ..Default::default()
        }
    }

    /// Local development over plain HTTP
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Read overrides from the process environment
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup, starting at [`AuthConfig::with_random_secret`].
    ///
    /// Recognised keys: `MAX_FAILED_ATTEMPTS`, `LOGIN_TIMEOUT_SECS`,
    /// `SESSION_IDLE_TIMEOUT_SECS`, `SESSION_COOKIE_NAME`, `COOKIE_SECURE`,
    /// `COOKIE_SAME_SITE`, `AUTH_SESSION_SECRET` (base64, 32 bytes),
    /// `AUTH_PASSWORD_PEPPER`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthResult<Self> {
        let mut config = Self::with_random_secret();

        if let Some(max) = parse_var::<u32>(&lookup, "MAX_FAILED_ATTEMPTS")? {
            config.max_failed_attempts = max;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "LOGIN_TIMEOUT_SECS")? {
            config.login_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "SESSION_IDLE_TIMEOUT_SECS")? {
            config.session_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            config.session_cookie_name = name;
        }
        if let Some(secure) = parse_var::<bool>(&lookup, "COOKIE_SECURE")? {
            config.cookie_secure = secure;
        }
        if let Some(same_site) = lookup("COOKIE_SAME_SITE") {
            config.cookie_same_site = SameSite::parse(&same_site).ok_or_else(|| {
                AuthError::InvalidConfig(format!("COOKIE_SAME_SITE: unknown value {same_site:?}"))
            })?;
        }
        match lookup("AUTH_SESSION_SECRET") {
            Some(encoded) => config.session_secret = decode_session_secret(&encoded)?,
            None => tracing::warn!(
                "AUTH_SESSION_SECRET not set, using a random key; sessions will not survive a restart"
            ),
        }
        if let Some(pepper) = lookup("AUTH_PASSWORD_PEPPER") {
            config.password_pepper = Some(pepper.into_bytes());
        }

        // Fail at startup rather than on the first login
        config.lockout_policy()?;
        Ok(config)
    }

    pub fn lockout_policy(&self) -> AuthResult<LockoutPolicy> {
        LockoutPolicy::new(self.max_failed_attempts, self.login_timeout)
    }

    pub fn session_idle_timeout(&self) -> AuthResult<chrono::Duration> {
        chrono::Duration::from_std(self.session_idle_timeout)
            .map_err(|e| AuthError::InvalidConfig(format!("session_idle_timeout: {e}")))
    }

    /// Attributes of the session cookie
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age_secs: Some(self.session_idle_timeout.as_secs()),
        }
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AuthResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AuthError::InvalidConfig(format!("{key}: {e}")))
        })
        .transpose()
}

fn decode_session_secret(encoded: &str) -> AuthResult<[u8; 32]> {
    let bytes = platform::crypto::from_base64(encoded.trim())
        .map_err(|e| AuthError::InvalidConfig(format!("AUTH_SESSION_SECRET: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        AuthError::InvalidConfig(format!(
            "AUTH_SESSION_SECRET must decode to 32 bytes, got {}",
            bytes.len()
        ))
    })
}
