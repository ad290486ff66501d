//! Shared primitives for all Rust crates in OpMetrics.

#![forbid(unsafe_code)]

/// Request-scoped caller metadata.
pub mod context;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use context::RequestContext;

/// Result type used across OpMetrics crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Authentication failures deliberately collapse into `Unauthorized`
/// with a generic message; only lockout and token expiry carry a
/// distinguishing variant, because clients need to render a countdown
/// or redirect for those.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated or presented invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Account refused because of too many consecutive failures.
    #[error("account locked until {locked_until}")]
    AccountLocked {
        /// Instant at which the lock clears and attempts may resume.
        locked_until: DateTime<Utc>,
    },

    /// Bearer token is malformed or carries a wrong signature.
    #[error("invalid token: {0}")]
    TokenInvalid(String),

    /// Bearer token has a valid signature but its expiry has passed.
    #[error("session expired")]
    TokenExpired,

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
