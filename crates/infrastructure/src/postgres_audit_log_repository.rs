//! PostgreSQL-backed audit log repository.

use async_trait::async_trait;
use sqlx::PgPool;

use opmetrics_application::{AuditEvent, AuditLogRepository};
use opmetrics_core::{AppError, AppResult};

/// PostgreSQL-backed repository for audit events.
///
/// Rows are insert-only and timestamped by the database server, so
/// ordering does not depend on application clocks.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                entity,
                record_id,
                action,
                actor_id,
                ip_address,
                user_agent,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.entity)
        .bind(event.record_id.map(|id| id.as_uuid()))
        .bind(event.action.as_str())
        .bind(event.actor.map(|id| id.as_uuid()))
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}
