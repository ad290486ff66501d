use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Duration;

use opmetrics_domain::{AccountId, DirectoryPrincipal};

use crate::auth_ports::IssuedToken;

use super::*;

struct TestAccounts {
    by_login: Mutex<HashMap<String, AccountRecord>>,
    failed_attempt_calls: Mutex<Vec<(AccountId, i32, Option<DateTime<Utc>>)>>,
    successful_login_calls: Mutex<Vec<AccountId>>,
    upsert_calls: Mutex<u32>,
}

impl TestAccounts {
    fn with_accounts(accounts: Vec<AccountRecord>) -> Self {
        let by_login = accounts
            .into_iter()
            .map(|account| (account.login_name.clone(), account))
            .collect();
        Self {
            by_login: Mutex::new(by_login),
            failed_attempt_calls: Mutex::new(Vec::new()),
            successful_login_calls: Mutex::new(Vec::new()),
            upsert_calls: Mutex::new(0),
        }
    }

    fn empty() -> Self {
        Self::with_accounts(Vec::new())
    }

    fn stored(&self, login_name: &str) -> Option<AccountRecord> {
        self.by_login
            .lock()
            .ok()
            .and_then(|guard| guard.get(login_name).cloned())
    }

    fn failed_attempt_count(&self) -> usize {
        self.failed_attempt_calls
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_default()
    }

    fn successful_login_count(&self) -> usize {
        self.successful_login_calls
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_default()
    }

    fn upsert_count(&self) -> u32 {
        self.upsert_calls
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AccountRepository for TestAccounts {
    async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<AccountRecord>> {
        let guard = self
            .by_login
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?;
        Ok(guard.get(login_name).cloned())
    }

    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.failed_attempt_calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?
            .push((account_id, failed_attempts, locked_until));
        let mut guard = self
            .by_login
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?;
        for account in guard.values_mut() {
            if account.id == account_id {
                account.failed_attempts = failed_attempts;
                account.locked_until = locked_until;
            }
        }
        Ok(())
    }

    async fn record_successful_login(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.successful_login_calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?
            .push(account_id);
        let mut guard = self
            .by_login
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?;
        for account in guard.values_mut() {
            if account.id == account_id {
                account.failed_attempts = 0;
                account.locked_until = None;
                account.last_login_at = Some(at);
            }
        }
        Ok(())
    }

    async fn upsert_directory_account(
        &self,
        principal: &DirectoryPrincipal,
        role: opmetrics_domain::Role,
    ) -> AppResult<AccountRecord> {
        *self
            .upsert_calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))? +=
            1;
        let mut guard = self
            .by_login
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?;
        let account = guard
            .entry(principal.login_name.clone())
            .or_insert_with(|| AccountRecord {
                id: AccountId::new(),
                login_name: principal.login_name.clone(),
                display_name: principal.display_name.clone(),
                email: principal.email.clone(),
                department: principal.department.clone(),
                employee_number: principal.employee_number.clone(),
                role,
                is_active: true,
                password_hash: None,
                failed_attempts: 0,
                locked_until: None,
                last_login_at: None,
            });
        account.role = role;
        account.display_name = principal.display_name.clone();
        Ok(account.clone())
    }
}

struct TestHasher;

impl PasswordHasher for TestHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash == format!("hashed:{password}"))
    }
}

struct ScriptedDirectory {
    outcome: DirectoryOutcome,
    calls: Mutex<u32>,
}

impl ScriptedDirectory {
    fn answering(outcome: DirectoryOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.lock().map(|guard| *guard).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DirectoryAuthenticator for ScriptedDirectory {
    async fn authenticate(&self, _login_name: &str, _secret: &str) -> AppResult<DirectoryOutcome> {
        *self
            .calls
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))? +=
            1;
        Ok(self.outcome.clone())
    }
}

struct StaticTokens;

impl TokenIssuer for StaticTokens {
    fn issue(&self, account: &AccountRecord) -> AppResult<IssuedToken> {
        let claims = SessionClaims {
            account_id: account.id,
            login_name: account.login_name.clone(),
            role: account.role,
            department: account.department.clone(),
            expires_at: Utc::now() + Duration::minutes(30),
        };
        Ok(IssuedToken {
            token: format!("token-for-{}", account.login_name),
            claims,
        })
    }

    fn verify(&self, _token: &str, _ignore_expiry: bool) -> AppResult<SessionClaims> {
        Err(AppError::Internal("verification not scripted".to_owned()))
    }
}

struct RecordingAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl crate::audit_trail::AuditLogRepository for RecordingAudit {
    async fn append(&self, event: AuditEvent) -> AppResult<()> {
        self.events
            .lock()
            .map_err(|error| AppError::Internal(format!("failed to lock test state: {error}")))?
            .push(event);
        Ok(())
    }
}

struct FailingAudit;

#[async_trait::async_trait]
impl crate::audit_trail::AuditLogRepository for FailingAudit {
    async fn append(&self, _event: AuditEvent) -> AppResult<()> {
        Err(AppError::Internal("audit store offline".to_owned()))
    }
}

fn local_account(login_name: &str, password: &str) -> AccountRecord {
    AccountRecord {
        id: AccountId::new(),
        login_name: login_name.to_owned(),
        display_name: "Test Person".to_owned(),
        email: Some(format!("{login_name}@example.gov")),
        department: Some("Operations".to_owned()),
        employee_number: None,
        role: opmetrics_domain::Role::Officer,
        is_active: true,
        password_hash: Some(format!("hashed:{password}")),
        failed_attempts: 0,
        locked_until: None,
        last_login_at: None,
    }
}

fn directory_account(login_name: &str) -> AccountRecord {
    AccountRecord {
        password_hash: None,
        ..local_account(login_name, "unused")
    }
}

fn verified_principal(login_name: &str, groups: Vec<&str>) -> DirectoryOutcome {
    DirectoryOutcome::Verified {
        principal: DirectoryPrincipal {
            login_name: login_name.to_owned(),
            display_name: "Directory Person".to_owned(),
            email: Some(format!("{login_name}@example.gov")),
            department: Some("Planning".to_owned()),
            title: None,
            employee_number: Some("E-1042".to_owned()),
            groups: groups.into_iter().map(str::to_owned).collect(),
        },
    }
}

fn build_service(
    accounts: Arc<TestAccounts>,
    directory: Arc<ScriptedDirectory>,
    audit: Arc<RecordingAudit>,
) -> AuthService {
    AuthService::new(
        accounts,
        Arc::new(TestHasher),
        directory,
        Arc::new(StaticTokens),
        AuditTrail::new(audit),
        GroupRoleMap::standard(),
        LockoutPolicy::default(),
    )
}

fn context() -> RequestContext {
    RequestContext {
        ip_address: Some("10.0.0.8".to_owned()),
        user_agent: Some("test-client".to_owned()),
    }
}

#[tokio::test]
async fn unknown_login_fails_generically_without_account_reference() {
    let accounts = Arc::new(TestAccounts::empty());
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Unavailable));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts.clone(), directory, audit.clone());

    let result = service.authenticate("ghost", "whatever", &context()).await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::LoginFailure);
    assert_eq!(events[0].record_id, None);
    // No lockout state may accumulate for a name with no account.
    assert_eq!(accounts.failed_attempt_count(), 0);
}

#[tokio::test]
async fn correct_password_issues_token_and_resets_counters() {
    let mut account = local_account("mkhumalo", "s3cret-enough");
    account.failed_attempts = 2;
    account.locked_until = Some(Utc::now() - Duration::minutes(5));
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts.clone(), directory.clone(), audit.clone());

    let session = service
        .authenticate("mkhumalo", "s3cret-enough", &context())
        .await
        .unwrap_or_else(|error| panic!("login should succeed: {error}"));

    assert_eq!(session.token, "token-for-mkhumalo");
    assert_eq!(session.account.failed_attempts, 0);
    assert_eq!(session.account.locked_until, None);
    assert!(session.account.last_login_at.is_some());
    assert_eq!(directory.call_count(), 0);

    let stored = accounts.stored("mkhumalo");
    assert_eq!(stored.map(|account| account.failed_attempts), Some(0));
    assert_eq!(accounts.successful_login_count(), 1);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::LoginSuccess);
}

#[tokio::test]
async fn expired_lock_does_not_block_a_correct_password() {
    let mut account = local_account("mkhumalo", "s3cret-enough");
    account.locked_until = Some(Utc::now() - Duration::seconds(1));
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory, audit);

    let result = service
        .authenticate("mkhumalo", "s3cret-enough", &context())
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn fourth_consecutive_failure_locks_for_thirty_minutes() {
    let account = local_account("mkhumalo", "s3cret-enough");
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts.clone(), directory.clone(), audit.clone());

    for _ in 0..3 {
        let result = service.authenticate("mkhumalo", "wrong", &context()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    let before = Utc::now();
    let result = service.authenticate("mkhumalo", "wrong", &context()).await;
    let after = Utc::now();

    let locked_until = match result {
        Err(AppError::AccountLocked { locked_until }) => locked_until,
        other => panic!("expected lockout, got {other:?}"),
    };
    assert!(locked_until >= before + Duration::minutes(30));
    assert!(locked_until <= after + Duration::minutes(30));

    let stored = accounts.stored("mkhumalo");
    assert_eq!(
        stored.as_ref().map(|account| account.failed_attempts),
        Some(4)
    );
    assert!(stored.is_some_and(|account| account.locked_until.is_some()));
    // Local failures never consult the directory.
    assert_eq!(directory.call_count(), 0);
    assert_eq!(audit.events().len(), 4);
}

#[tokio::test]
async fn locked_account_is_refused_without_consuming_an_attempt() {
    let mut account = local_account("mkhumalo", "s3cret-enough");
    account.failed_attempts = 4;
    account.locked_until = Some(Utc::now() + Duration::minutes(10));
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(verified_principal(
        "mkhumalo",
        vec!["CN=OPM_Administrators,OU=Groups,DC=example,DC=gov"],
    )));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts.clone(), directory.clone(), audit.clone());

    // Even the correct password is refused while the lock holds.
    let result = service
        .authenticate("mkhumalo", "s3cret-enough", &context())
        .await;

    assert!(matches!(result, Err(AppError::AccountLocked { .. })));
    assert_eq!(accounts.failed_attempt_count(), 0);
    assert_eq!(directory.call_count(), 0);
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::LoginFailure);
}

#[tokio::test]
async fn lockout_blocks_directory_fallback_for_hashless_accounts() {
    let mut account = directory_account("tnaidoo");
    account.locked_until = Some(Utc::now() + Duration::minutes(10));
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(verified_principal(
        "tnaidoo",
        vec![],
    )));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory.clone(), audit);

    let result = service
        .authenticate("tnaidoo", "directory-pass", &context())
        .await;

    assert!(matches!(result, Err(AppError::AccountLocked { .. })));
    assert_eq!(directory.call_count(), 0);
}

#[tokio::test]
async fn wrong_local_password_never_falls_through_to_directory() {
    let account = local_account("mkhumalo", "s3cret-enough");
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    // The directory would accept; a local decision must still stand.
    let directory = Arc::new(ScriptedDirectory::answering(verified_principal(
        "mkhumalo",
        vec!["CN=OPM_Administrators,OU=Groups,DC=example,DC=gov"],
    )));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory.clone(), audit);

    let result = service.authenticate("mkhumalo", "wrong", &context()).await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(directory.call_count(), 0);
}

#[tokio::test]
async fn directory_unavailable_reads_as_invalid_credentials() {
    let account = directory_account("tnaidoo");
    let account_id = account.id;
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Unavailable));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory.clone(), audit.clone());

    let result = service
        .authenticate("tnaidoo", "directory-pass", &context())
        .await;

    // Outage must not leak as a server error or a distinct message.
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(directory.call_count(), 1);
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].record_id, Some(account_id));
}

#[tokio::test]
async fn directory_verification_provisions_an_account_with_mapped_role() {
    let accounts = Arc::new(TestAccounts::empty());
    let directory = Arc::new(ScriptedDirectory::answering(verified_principal(
        "tnaidoo",
        vec![
            "CN=OPM_Viewers,OU=Groups,DC=example,DC=gov",
            "CN=OPM_Managers,OU=Groups,DC=example,DC=gov",
        ],
    )));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts.clone(), directory, audit.clone());

    let session = service
        .authenticate("tnaidoo", "directory-pass", &context())
        .await
        .unwrap_or_else(|error| panic!("directory login should succeed: {error}"));

    assert_eq!(session.account.role, opmetrics_domain::Role::Manager);
    assert_eq!(session.account.password_hash, None);
    assert_eq!(accounts.upsert_count(), 1);
    assert!(accounts.stored("tnaidoo").is_some());
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::LoginSuccess);
    assert_eq!(events[0].actor, Some(session.account.id));
}

#[tokio::test]
async fn inactive_account_fails_generically() {
    let mut account = local_account("mkhumalo", "s3cret-enough");
    account.is_active = false;
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory.clone(), audit.clone());

    let result = service
        .authenticate("mkhumalo", "s3cret-enough", &context())
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
    assert_eq!(directory.call_count(), 0);
    assert_eq!(audit.events().len(), 1);
}

#[tokio::test]
async fn blank_login_name_is_rejected_before_any_lookup() {
    let accounts = Arc::new(TestAccounts::empty());
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory.clone(), audit.clone());

    let result = service.authenticate("   ", "whatever", &context()).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(directory.call_count(), 0);
    assert!(audit.events().is_empty());
}

#[tokio::test]
async fn audit_store_failure_does_not_fail_the_login() {
    let account = local_account("mkhumalo", "s3cret-enough");
    let accounts = Arc::new(TestAccounts::with_accounts(vec![account]));
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let service = AuthService::new(
        accounts,
        Arc::new(TestHasher),
        directory,
        Arc::new(StaticTokens),
        AuditTrail::new(Arc::new(FailingAudit)),
        GroupRoleMap::standard(),
        LockoutPolicy::default(),
    );

    let result = service
        .authenticate("mkhumalo", "s3cret-enough", &context())
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn logout_appends_a_logout_event() {
    let accounts = Arc::new(TestAccounts::empty());
    let directory = Arc::new(ScriptedDirectory::answering(DirectoryOutcome::Denied));
    let audit = Arc::new(RecordingAudit::new());
    let service = build_service(accounts, directory, audit.clone());

    let claims = SessionClaims {
        account_id: AccountId::new(),
        login_name: "mkhumalo".to_owned(),
        role: opmetrics_domain::Role::Officer,
        department: None,
        expires_at: Utc::now() + Duration::minutes(30),
    };
    service.logout(&claims, &context()).await;

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::Logout);
    assert_eq!(events[0].actor, Some(claims.account_id));
}
