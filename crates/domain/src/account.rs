//! Account identity and role types.

use std::str::FromStr;

use opmetrics_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random account identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an account identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Maximum accepted login name length.
pub const LOGIN_NAME_MAX_LENGTH: usize = 100;

/// Validated, canonicalized (trimmed, lowercase) login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginName(String);

impl LoginName {
    /// Creates a validated login name.
    ///
    /// Login names are trimmed and lowercased so the same principal is
    /// matched regardless of how the caller capitalized it.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let canonical = value.trim().to_lowercase();

        if canonical.is_empty() {
            return Err(AppError::Validation(
                "login name must not be empty".to_owned(),
            ));
        }

        if canonical.len() > LOGIN_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "login name must not exceed {LOGIN_NAME_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(canonical))
    }

    /// Returns the canonical login name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<LoginName> for String {
    fn from(value: LoginName) -> Self {
        value.0
    }
}

impl std::fmt::Display for LoginName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Application role, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full system administration.
    Administrator,
    /// Manages plans and approves submissions.
    Manager,
    /// Captures and updates KPI data.
    Officer,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Returns the storage and display string for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Manager => "Manager",
            Self::Officer => "Officer",
            Self::Viewer => "Viewer",
        }
    }

    /// Seniority rank; lower is more privileged.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Administrator => 0,
            Self::Manager => 1,
            Self::Officer => 2,
            Self::Viewer => 3,
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Administrator" => Ok(Self::Administrator),
            "Manager" => Ok(Self::Manager),
            "Officer" => Ok(Self::Officer),
            "Viewer" => Ok(Self::Viewer),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
