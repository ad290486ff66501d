//! OpMetrics API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use opmetrics_application::{AuditTrail, AuthService, DirectoryAuthenticator, TokenIssuer};
use opmetrics_core::AppError;
use opmetrics_domain::{GroupRoleMap, LockoutPolicy};
use opmetrics_infrastructure::{
    Argon2PasswordHasher, JwtTokenIssuer, LdapDirectoryClient, PostgresAccountRepository,
    PostgresAuditLogRepository, UnavailableDirectory,
};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let account_repository = Arc::new(PostgresAccountRepository::new(pool.clone()));
    let audit_trail = AuditTrail::new(Arc::new(PostgresAuditLogRepository::new(pool.clone())));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let jwt_token_issuer = Arc::new(JwtTokenIssuer::new(
        &config.jwt_secret,
        config.session_policy,
    ));
    let token_issuer: Arc<dyn TokenIssuer> = jwt_token_issuer;

    let (directory, ldap_directory): (
        Arc<dyn DirectoryAuthenticator>,
        Option<Arc<LdapDirectoryClient>>,
    ) = match config.ldap.clone() {
        Some(settings) => {
            let client = Arc::new(LdapDirectoryClient::new(settings));
            // Startup probe is informational; logins keep retrying
            // the directory per call either way.
            client.init().await;
            (client.clone(), Some(client))
        }
        None => {
            info!("no directory configured; accepting local credentials only");
            (Arc::new(UnavailableDirectory), None)
        }
    };

    let auth_service = AuthService::new(
        account_repository,
        password_hasher,
        directory,
        token_issuer.clone(),
        audit_trail.clone(),
        GroupRoleMap::standard(),
        LockoutPolicy::default(),
    );

    let app_state = AppState {
        auth_service,
        audit_trail,
        token_issuer,
        session_policy: config.session_policy,
        ldap_directory,
    };

    let guarded_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/session-status", get(auth::session_status_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_session,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(&config.frontend_url).map_err(|error| {
            AppError::Internal(format!("invalid FRONTEND_URL: {error}"))
        })?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(middleware::SESSION_WARNING_HEADER)]);

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .merge(guarded_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "opmetrics-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
