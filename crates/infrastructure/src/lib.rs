//! Infrastructure adapters for the OpMetrics auth subsystem.
//!
//! Implements the application-layer ports against PostgreSQL, Argon2,
//! JSON Web Tokens, and an LDAP directory.

#![forbid(unsafe_code)]

/// Argon2id password hashing adapter.
pub mod argon2_password_hasher;
/// JSON Web Token signing and verification adapter.
pub mod jwt_token_issuer;
/// LDAP directory verification adapter.
pub mod ldap_directory_client;
/// PostgreSQL account repository adapter.
pub mod postgres_account_repository;
/// PostgreSQL audit log repository adapter.
pub mod postgres_audit_log_repository;
/// Null directory adapter for deployments without a directory.
pub mod unavailable_directory;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use jwt_token_issuer::JwtTokenIssuer;
pub use ldap_directory_client::{LdapDirectoryClient, LdapSettings};
pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use unavailable_directory::UnavailableDirectory;
