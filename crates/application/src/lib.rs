//! Application services and ports for the OpMetrics auth subsystem.

#![forbid(unsafe_code)]

/// Ports for accounts, credentials, directory, and tokens.
pub mod auth_ports;
/// Credential verification orchestration.
pub mod auth_service;
/// Append-only audit trail facade.
pub mod audit_trail;

pub use audit_trail::{AuditEvent, AuditLogRepository, AuditTrail};
pub use auth_ports::{
    AccountRecord, AccountRepository, DirectoryAuthenticator, DirectoryOutcome, IssuedToken,
    PasswordHasher, TokenIssuer,
};
pub use auth_service::{AuthService, AuthenticatedSession};
