//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

/// Login form body (`application/x-www-form-urlencoded`)
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pwd: String,
}

/// Session status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user_name: Option<String>,
    pub issued_at_ms: Option<i64>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_name: None,
            issued_at_ms: None,
        }
    }
}
