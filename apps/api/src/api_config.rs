use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use opmetrics_core::AppError;
use opmetrics_domain::SessionPolicy;
use opmetrics_infrastructure::LdapSettings;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub jwt_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub session_policy: SessionPolicy,
    pub ldap: Option<LdapSettings>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let jwt_secret = required_env("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT_SECRET must be at least 32 characters".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let session_minutes = parsed_env("SESSION_TIMEOUT_MINUTES", 30)?;
        let warning_minutes = parsed_env("SESSION_WARNING_MINUTES", 5)?;
        let session_policy = SessionPolicy::new(session_minutes, warning_minutes)?;

        // The directory block is all-or-nothing: LDAP_URL switches it
        // on, and the remaining settings are then mandatory.
        let ldap = match env::var("LDAP_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let timeout_secs: u64 = parsed_env("LDAP_TIMEOUT_SECS", 5)?;
                Some(LdapSettings {
                    url,
                    service_dn: required_non_empty_env("LDAP_SERVICE_DN")?,
                    service_password: required_non_empty_env("LDAP_SERVICE_PASSWORD")?,
                    base_dn: required_non_empty_env("LDAP_BASE_DN")?,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            _ => None,
        };

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            jwt_secret,
            api_host,
            api_port,
            session_policy,
            ldap,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parsed_env<T: FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
