//! Domain types for the OpMetrics authentication subsystem.

#![forbid(unsafe_code)]

/// Account identity, login names, and application roles.
pub mod account;
/// Audit trail actions.
pub mod audit;
/// Directory principals and group-to-role mapping.
pub mod directory;
/// Session policy, lockout policy, and bearer-token claims.
pub mod session;
/// Client-side inactivity countdown state machine.
pub mod timeout_monitor;

pub use account::{AccountId, LoginName, Role};
pub use audit::AuditAction;
pub use directory::{DirectoryPrincipal, GroupRoleMap};
pub use session::{LockoutPolicy, SessionClaims, SessionPolicy};
pub use timeout_monitor::{LogoutHandler, MonitorState, TimeoutMonitor};
