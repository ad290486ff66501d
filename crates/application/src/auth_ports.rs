//! Ports consumed by the authentication services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use opmetrics_core::AppResult;
use opmetrics_domain::{AccountId, DirectoryPrincipal, Role, SessionClaims};

/// Account record returned by repository queries.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// Unique account identifier.
    pub id: AccountId,
    /// Canonical (lowercase) login name.
    pub login_name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Email address, if known.
    pub email: Option<String>,
    /// Organizational department, if known.
    pub department: Option<String>,
    /// Employee number, if known.
    pub employee_number: Option<String>,
    /// Application role.
    pub role: Role,
    /// Disabled accounts cannot authenticate through any path.
    pub is_active: bool,
    /// Argon2id hash, or `None` for directory-only accounts.
    pub password_hash: Option<String>,
    /// Consecutive failed login attempts.
    pub failed_attempts: i32,
    /// Lock expiry, if the account is locked.
    pub locked_until: Option<DateTime<Utc>>,
    /// Last successful login, if any.
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    /// True while a lock expiry lies in the future.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Repository port for account persistence.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Finds an account by canonical login name.
    async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<AccountRecord>>;

    /// Stores the outcome of a failed verification: the new attempt
    /// count and, once the threshold is reached, the lock expiry.
    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Clears the failure counter and lock, and stamps the last
    /// successful login.
    async fn record_successful_login(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Creates or refreshes the local row for a directory-verified
    /// principal. Never writes a password hash; the directory stays
    /// the source of truth for the secret.
    async fn upsert_directory_account(
        &self,
        principal: &DirectoryPrincipal,
        role: Role,
    ) -> AppResult<AccountRecord>;
}

/// Port for password hashing. Keeps the application layer free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password with a fresh salt.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Outcome of a directory verification attempt.
///
/// `Denied` and `Unavailable` must be treated identically by callers
/// deciding what to tell the user; the split exists only so logs can
/// show whether the directory was consulted at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    /// The directory bind proved the secret.
    Verified {
        /// Attributes read from the matched entry.
        principal: DirectoryPrincipal,
    },
    /// The entry was absent, ambiguous, or the bind was rejected.
    Denied,
    /// The directory could not be consulted for this call.
    Unavailable,
}

/// Port for directory-backed credential verification.
#[async_trait]
pub trait DirectoryAuthenticator: Send + Sync {
    /// Searches for the principal and proves the secret by binding as
    /// the found entry. Transport problems degrade to
    /// [`DirectoryOutcome::Unavailable`] instead of erroring.
    async fn authenticate(&self, login_name: &str, secret: &str) -> AppResult<DirectoryOutcome>;
}

/// A freshly minted bearer token with its embedded claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Signed wire form handed to the client.
    pub token: String,
    /// Claims embedded in the token.
    pub claims: SessionClaims,
}

/// Port for signing and verifying bearer tokens.
pub trait TokenIssuer: Send + Sync {
    /// Signs a token for the account with an absolute expiry of
    /// now + session lifetime.
    fn issue(&self, account: &AccountRecord) -> AppResult<IssuedToken>;

    /// Verifies signature first, then expiry unless `ignore_expiry`.
    ///
    /// `ignore_expiry` exists solely so the session guard can compute
    /// remaining time for its warning header; expired claims must
    /// never authorize business logic.
    fn verify(&self, token: &str, ignore_expiry: bool) -> AppResult<SessionClaims>;
}
