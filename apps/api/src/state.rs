use std::sync::Arc;

use opmetrics_application::{AuditTrail, AuthService, TokenIssuer};
use opmetrics_domain::SessionPolicy;
use opmetrics_infrastructure::LdapDirectoryClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub audit_trail: AuditTrail,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub session_policy: SessionPolicy,
    /// Present only when a directory is configured; the health probe
    /// reports its last observed reachability.
    pub ldap_directory: Option<Arc<LdapDirectoryClient>>,
}
