//! PostgreSQL-backed account repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use opmetrics_application::{AccountRecord, AccountRepository};
use opmetrics_core::{AppError, AppResult};
use opmetrics_domain::{AccountId, DirectoryPrincipal, Role};

const ACCOUNT_COLUMNS: &str = r#"
    id,
    login_name,
    display_name,
    email,
    department,
    employee_number,
    role,
    is_active,
    password_hash,
    failed_attempts,
    locked_until,
    last_login_at
"#;

/// Raw account row; the stored role string is validated on the way
/// out rather than trusted.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    login_name: String,
    display_name: String,
    email: Option<String>,
    department: Option<String>,
    employee_number: Option<String>,
    role: String,
    is_active: bool,
    password_hash: Option<String>,
    failed_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
}

impl AccountRow {
    fn into_record(self) -> AppResult<AccountRecord> {
        let role = Role::from_str(&self.role).map_err(|_| {
            AppError::Internal(format!(
                "account {} has unknown stored role '{}'",
                self.id, self.role
            ))
        })?;

        Ok(AccountRecord {
            id: AccountId::from_uuid(self.id),
            login_name: self.login_name,
            display_name: self.display_name,
            email: self.email,
            department: self.department,
            employee_number: self.employee_number,
            role,
            is_active: self.is_active,
            password_hash: self.password_hash,
            failed_attempts: self.failed_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
        })
    }
}

/// PostgreSQL-backed repository for account records.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<AccountRecord>> {
        // Login names are stored canonicalized; match the stored form
        // case-insensitively anyway in case rows predate that rule.
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE LOWER(login_name) = LOWER($1)
            "#
        ))
        .bind(login_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up account: {error}")))?;

        row.map(AccountRow::into_record).transpose()
    }

    async fn record_failed_attempt(
        &self,
        account_id: AccountId,
        failed_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = $2,
                locked_until = $3
            WHERE id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(failed_attempts)
        .bind(locked_until)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record failed attempt: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("account {account_id}")));
        }

        Ok(())
    }

    async fn record_successful_login(
        &self,
        account_id: AccountId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = 0,
                locked_until = NULL,
                last_login_at = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record successful login: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("account {account_id}")));
        }

        Ok(())
    }

    async fn upsert_directory_account(
        &self,
        principal: &DirectoryPrincipal,
        role: Role,
    ) -> AppResult<AccountRecord> {
        // Directory logins refresh the mirrored attributes but never
        // touch the local credential, the active flag, or the lockout
        // counters.
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (
                id,
                login_name,
                display_name,
                email,
                department,
                employee_number,
                role,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            ON CONFLICT (login_name) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                email = COALESCE(EXCLUDED.email, accounts.email),
                department = COALESCE(EXCLUDED.department, accounts.department),
                employee_number = COALESCE(EXCLUDED.employee_number, accounts.employee_number),
                role = EXCLUDED.role
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&principal.login_name)
        .bind(&principal.display_name)
        .bind(&principal.email)
        .bind(&principal.department)
        .bind(&principal.employee_number)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to upsert directory account: {error}"))
        })?;

        row.into_record()
    }
}
