//! Audit trail action tags.

use std::str::FromStr;

use opmetrics_core::AppError;
use serde::{Deserialize, Serialize};

/// Action recorded against an audit event. The storage strings match
/// the historical audit table, so existing log consumers keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A credential check succeeded and a token was issued.
    LoginSuccess,
    /// A credential check failed (any reason).
    LoginFailure,
    /// The user ended their session explicitly.
    Logout,
    /// A request arrived with a token past its expiry.
    SessionExpired,
}

impl AuditAction {
    /// Returns the storage string for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailure => "LOGIN_FAILED",
            Self::Logout => "LOGOUT",
            Self::SessionExpired => "SESSION_EXPIRED",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOGIN_SUCCESS" => Ok(Self::LoginSuccess),
            "LOGIN_FAILED" => Ok(Self::LoginFailure),
            "LOGOUT" => Ok(Self::Logout),
            "SESSION_EXPIRED" => Ok(Self::SessionExpired),
            _ => Err(AppError::Validation(format!(
                "unknown audit action '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AuditAction;

    #[test]
    fn actions_round_trip_through_storage_strings() {
        for action in [
            AuditAction::LoginSuccess,
            AuditAction::LoginFailure,
            AuditAction::Logout,
            AuditAction::SessionExpired,
        ] {
            assert_eq!(AuditAction::from_str(action.as_str()).ok(), Some(action));
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(AuditAction::from_str("TRUNCATED").is_err());
    }
}
