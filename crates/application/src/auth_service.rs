//! Credential verification orchestration.
//!
//! Verification order is local-first: an account with a stored hash
//! is decided entirely by that hash, and a failed local check never
//! falls through to the directory. The directory is consulted only
//! when the login name is unknown or the account carries no local
//! hash. Lockout blocks every path uniformly, including directory
//! fallback. All terminal failures except lockout collapse into one
//! generic invalid-credentials error so callers cannot enumerate
//! accounts.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use opmetrics_core::{AppError, AppResult, RequestContext};
use opmetrics_domain::{AuditAction, GroupRoleMap, LockoutPolicy, LoginName, SessionClaims};

use crate::audit_trail::{AuditEvent, AuditTrail};
use crate::auth_ports::{
    AccountRecord, AccountRepository, DirectoryAuthenticator, DirectoryOutcome, PasswordHasher,
    TokenIssuer,
};

#[cfg(test)]
mod tests;

/// Successful authentication result.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    /// Signed bearer token for the client.
    pub token: String,
    /// Claims embedded in the token.
    pub claims: SessionClaims,
    /// Account state after the login side effects.
    pub account: AccountRecord,
}

/// Application service orchestrating login verification, lockout, and
/// audit emission.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    directory: Arc<dyn DirectoryAuthenticator>,
    token_issuer: Arc<dyn TokenIssuer>,
    audit_trail: AuditTrail,
    role_map: GroupRoleMap,
    lockout: LockoutPolicy,
}

impl AuthService {
    /// Creates the service from its collaborators.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        directory: Arc<dyn DirectoryAuthenticator>,
        token_issuer: Arc<dyn TokenIssuer>,
        audit_trail: AuditTrail,
        role_map: GroupRoleMap,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            accounts,
            password_hasher,
            directory,
            token_issuer,
            audit_trail,
            role_map,
            lockout,
        }
    }

    /// Verifies a credential and mints a bearer token.
    ///
    /// Emits exactly one audit event per call: a success event on the
    /// issuing path, otherwise a failure event. Audit writes never
    /// affect the returned result.
    pub async fn authenticate(
        &self,
        login_name: &str,
        secret: &str,
        context: &RequestContext,
    ) -> AppResult<AuthenticatedSession> {
        let login = LoginName::new(login_name)?;
        let now = Utc::now();

        let account = self.accounts.find_by_login_name(login.as_str()).await?;

        if let Some(ref account) = account
            && let Some(locked_until) = account.locked_until
            && locked_until > now
        {
            // A locked account is refused outright: no verification
            // runs, no attempt is consumed, and the directory is not
            // consulted either.
            self.audit_failure(
                Some(account.id),
                context,
                serde_json::json!({"username": login.as_str(), "reason": "account locked"}),
            )
            .await;

            return Err(AppError::AccountLocked { locked_until });
        }

        if let Some(ref account) = account
            && !account.is_active
        {
            // Equalize timing with the hash-verification path.
            let _ = self.password_hasher.hash_password(secret);

            self.audit_failure(
                Some(account.id),
                context,
                serde_json::json!({"username": login.as_str(), "reason": "account disabled"}),
            )
            .await;

            return Err(invalid_credentials());
        }

        match account {
            Some(account) if account.password_hash.is_some() => {
                self.verify_local(account, secret, context, now).await
            }
            other => {
                let known_account_id = other.map(|account| account.id);
                self.verify_against_directory(&login, known_account_id, secret, context, now)
                    .await
            }
        }
    }

    /// Records a logout for an authenticated session.
    pub async fn logout(&self, claims: &SessionClaims, context: &RequestContext) {
        self.audit_trail
            .record(AuditEvent::for_account(
                AuditAction::Logout,
                Some(claims.account_id),
                context,
                None,
            ))
            .await;
    }

    /// Local hash verification; decides the attempt without touching
    /// the directory.
    async fn verify_local(
        &self,
        account: AccountRecord,
        secret: &str,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> AppResult<AuthenticatedSession> {
        let stored_hash = account.password_hash.clone().ok_or_else(|| {
            AppError::Internal("local verification requires a stored hash".to_owned())
        })?;

        if self.password_hasher.verify_password(secret, &stored_hash)? {
            return self.complete_login(account, context, now).await;
        }

        let failed_attempts = account.failed_attempts + 1;
        let locked_until = (failed_attempts >= self.lockout.max_failed_attempts)
            .then(|| self.lockout.lock_expiry(now));

        self.accounts
            .record_failed_attempt(account.id, failed_attempts, locked_until)
            .await?;

        self.audit_failure(
            Some(account.id),
            context,
            serde_json::json!({"username": account.login_name, "reason": "invalid password"}),
        )
        .await;

        match locked_until {
            // The failure that trips the threshold already answers
            // with the lockout, so the client can show the countdown.
            Some(locked_until) => Err(AppError::AccountLocked { locked_until }),
            None => Err(invalid_credentials()),
        }
    }

    /// Directory fallback for unknown logins and hashless accounts.
    async fn verify_against_directory(
        &self,
        login: &LoginName,
        known_account_id: Option<opmetrics_domain::AccountId>,
        secret: &str,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> AppResult<AuthenticatedSession> {
        match self.directory.authenticate(login.as_str(), secret).await? {
            DirectoryOutcome::Verified { principal } => {
                let role = self.role_map.resolve(&principal.groups);
                let account = self
                    .accounts
                    .upsert_directory_account(&principal, role)
                    .await?;

                self.complete_login(account, context, now).await
            }
            DirectoryOutcome::Denied | DirectoryOutcome::Unavailable => {
                // Transient directory trouble and a rejected secret
                // answer identically; only the audit detail differs
                // from the other failure paths.
                let _ = self.password_hasher.hash_password(secret);

                self.audit_failure(
                    known_account_id,
                    context,
                    serde_json::json!({"username": login.as_str(), "reason": "invalid credentials"}),
                )
                .await;

                Err(invalid_credentials())
            }
        }
    }

    /// Shared tail of every successful verification: counters reset,
    /// last login stamped, token minted, success audited.
    async fn complete_login(
        &self,
        account: AccountRecord,
        context: &RequestContext,
        now: DateTime<Utc>,
    ) -> AppResult<AuthenticatedSession> {
        self.accounts.record_successful_login(account.id, now).await?;

        let issued = self.token_issuer.issue(&account)?;

        self.audit_trail
            .record(AuditEvent::for_account(
                AuditAction::LoginSuccess,
                Some(account.id),
                context,
                None,
            ))
            .await;

        let mut account = account;
        account.failed_attempts = 0;
        account.locked_until = None;
        account.last_login_at = Some(now);

        Ok(AuthenticatedSession {
            token: issued.token,
            claims: issued.claims,
            account,
        })
    }

    async fn audit_failure(
        &self,
        account_id: Option<opmetrics_domain::AccountId>,
        context: &RequestContext,
        detail: serde_json::Value,
    ) {
        self.audit_trail
            .record(AuditEvent::for_account(
                AuditAction::LoginFailure,
                account_id,
                context,
                Some(detail),
            ))
            .await;
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid credentials".to_owned())
}
