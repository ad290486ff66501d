//! Wire-level request and response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opmetrics_application::AuthenticatedSession;

/// Incoming payload for username/password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account summary returned on successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Successful login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

impl LoginResponse {
    pub fn from_session(session: AuthenticatedSession, expires_in: i64) -> Self {
        let account = session.account;
        Self {
            token: session.token,
            user: LoginUser {
                id: account.id.as_uuid(),
                username: account.login_name,
                name: account.display_name,
                email: account.email,
                role: account.role.as_str().to_owned(),
                department: account.department,
                last_login: account.last_login_at,
            },
            expires_in,
        }
    }
}

/// Session introspection response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    /// True once the session has entered its final warning window.
    pub timeout_warning: bool,
}

/// Generic acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Liveness probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Reachability of the configured directory, if any.
    pub directory: &'static str,
}
