//! Append-only audit trail.
//!
//! Appends are fire-and-forget: a failed write is logged and
//! swallowed, never surfaced to the operation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;

use opmetrics_core::{AppResult, RequestContext};
use opmetrics_domain::{AccountId, AuditAction};

/// One append-only audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Target entity type, e.g. `"accounts"`.
    pub entity: String,
    /// Target record, when the event concerns a known account.
    pub record_id: Option<AccountId>,
    /// Action tag.
    pub action: AuditAction,
    /// Acting account; `None` for failures against unknown names.
    pub actor: Option<AccountId>,
    /// Origin network address, if known.
    pub ip_address: Option<String>,
    /// Origin client descriptor, if known.
    pub user_agent: Option<String>,
    /// Optional structured detail (reason codes, submitted name).
    pub detail: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Builds an event for the accounts entity from request context.
    #[must_use]
    pub fn for_account(
        action: AuditAction,
        account_id: Option<AccountId>,
        context: &RequestContext,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entity: "accounts".to_owned(),
            record_id: account_id,
            action,
            actor: account_id,
            ip_address: context.ip_address.clone(),
            user_agent: context.user_agent.clone(),
            detail,
        }
    }
}

/// Repository port for audit event persistence.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Appends one event. Entries are never updated or deleted.
    async fn append(&self, event: AuditEvent) -> AppResult<()>;
}

/// Application facade over the audit log.
#[derive(Clone)]
pub struct AuditTrail {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditTrail {
    /// Creates a trail from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Appends an event, absorbing any write failure.
    pub async fn record(&self, event: AuditEvent) {
        let action = event.action;
        if let Err(error) = self.repository.append(event).await {
            tracing::warn!(%error, action = action.as_str(), "audit append failed; event dropped");
        }
    }
}
