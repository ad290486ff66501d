//! Session policy and bearer-token claims.
//!
//! The 30-minute lifetime and 5-minute warning window are enforced in
//! two places: the server middleware is authoritative, the client
//! countdown is UX. Both read the same `SessionPolicy`.

use chrono::{DateTime, Duration, Utc};
use opmetrics_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::account::{AccountId, Role};

/// Shared session lifetime constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Total session lifetime in minutes.
    pub session_minutes: u32,
    /// Trailing warning window in minutes.
    pub warning_minutes: u32,
}

impl SessionPolicy {
    /// Creates a policy, rejecting a warning window that does not fit
    /// inside the session lifetime.
    pub fn new(session_minutes: u32, warning_minutes: u32) -> AppResult<Self> {
        if session_minutes == 0 {
            return Err(AppError::Validation(
                "session lifetime must be at least one minute".to_owned(),
            ));
        }

        if warning_minutes >= session_minutes {
            return Err(AppError::Validation(format!(
                "warning window ({warning_minutes}m) must be shorter than the session ({session_minutes}m)"
            )));
        }

        Ok(Self {
            session_minutes,
            warning_minutes,
        })
    }

    /// Token lifetime as a chrono duration.
    #[must_use]
    pub fn token_lifetime(&self) -> Duration {
        Duration::minutes(i64::from(self.session_minutes))
    }

    /// Session lifetime in whole seconds.
    #[must_use]
    pub fn session_seconds(&self) -> i64 {
        i64::from(self.session_minutes) * 60
    }

    /// Length of the trailing warning window in seconds.
    #[must_use]
    pub fn warning_seconds(&self) -> i64 {
        i64::from(self.warning_minutes) * 60
    }

    /// Seconds of silence before the client monitor shows its warning.
    #[must_use]
    pub fn idle_seconds_before_warning(&self) -> u64 {
        u64::from(self.session_minutes - self.warning_minutes) * 60
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            session_minutes: 30,
            warning_minutes: 5,
        }
    }
}

/// Account lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures at which the account locks.
    pub max_failed_attempts: i32,
    /// How long a lock lasts, in minutes.
    pub lockout_minutes: i64,
}

impl LockoutPolicy {
    /// Lock expiry for a lock imposed at `now`.
    #[must_use]
    pub fn lock_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.lockout_minutes)
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 4,
            lockout_minutes: 30,
        }
    }
}

/// Identity claims embedded in an issued bearer token.
///
/// Immutable once issued; re-authentication mints a new value rather
/// than mutating an old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account the token was issued to.
    pub account_id: AccountId,
    /// Canonical login name.
    pub login_name: String,
    /// Role at issuance time.
    pub role: Role,
    /// Department at issuance time.
    pub department: Option<String>,
    /// Absolute expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Whole seconds until expiry, negative once past it.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    /// True once the expiry instant has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) <= 0
    }

    /// True while the token is valid but inside the trailing warning
    /// window.
    #[must_use]
    pub fn in_warning_window(&self, now: DateTime<Utc>, policy: &SessionPolicy) -> bool {
        let remaining = self.remaining_seconds(now);
        remaining > 0 && remaining <= policy.warning_seconds()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{AccountId, LockoutPolicy, Role, SessionClaims, SessionPolicy};

    fn claims_expiring_in(seconds: i64) -> SessionClaims {
        SessionClaims {
            account_id: AccountId::new(),
            login_name: "tester".to_owned(),
            role: Role::Officer,
            department: Some("ICT".to_owned()),
            expires_at: Utc::now() + Duration::seconds(seconds),
        }
    }

    #[test]
    fn default_policy_is_thirty_five() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.session_seconds(), 1800);
        assert_eq!(policy.warning_seconds(), 300);
        assert_eq!(policy.idle_seconds_before_warning(), 1500);
    }

    #[test]
    fn warning_window_must_fit_inside_the_session() {
        assert!(SessionPolicy::new(30, 30).is_err());
        assert!(SessionPolicy::new(0, 0).is_err());
        assert!(SessionPolicy::new(30, 5).is_ok());
    }

    #[test]
    fn warning_applies_only_in_the_final_window() {
        let policy = SessionPolicy::default();
        let now = Utc::now();

        assert!(claims_expiring_in(200).in_warning_window(now, &policy));
        assert!(claims_expiring_in(300).in_warning_window(now, &policy));
        assert!(!claims_expiring_in(301).in_warning_window(now, &policy));
        assert!(!claims_expiring_in(0).in_warning_window(now, &policy));
        assert!(!claims_expiring_in(-5).in_warning_window(now, &policy));
    }

    #[test]
    fn expiry_is_exclusive_of_remaining_time() {
        let now = Utc::now();
        assert!(!claims_expiring_in(1).is_expired(now));
        assert!(claims_expiring_in(0).is_expired(now));
        assert!(claims_expiring_in(-1).is_expired(now));
    }

    #[test]
    fn lock_expiry_is_thirty_minutes_out_by_default() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        assert_eq!(policy.lock_expiry(now) - now, Duration::minutes(30));
    }
}
