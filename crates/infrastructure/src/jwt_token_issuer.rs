//! HS256 bearer-token signing and verification.
//!
//! Tokens carry the account identity, role, and department alongside
//! the standard `exp` claim. Verification runs with zero leeway so
//! the server-side expiry decision matches the claim exactly.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opmetrics_application::{AccountRecord, IssuedToken, TokenIssuer};
use opmetrics_core::{AppError, AppResult};
use opmetrics_domain::{AccountId, Role, SessionClaims, SessionPolicy};

/// Wire-level claim set.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClaims {
    user_id: Uuid,
    username: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    department: Option<String>,
    exp: i64,
}

/// Token issuer backed by a symmetric HS256 secret.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    policy: SessionPolicy,
}

impl JwtTokenIssuer {
    /// Creates an issuer from the shared secret and session policy.
    #[must_use]
    pub fn new(secret: &str, policy: SessionPolicy) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            policy,
        }
    }

    fn sign(&self, claims: &WireClaims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign token: {error}")))
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, account: &AccountRecord) -> AppResult<IssuedToken> {
        // `exp` only carries whole seconds, so the claims mirror the
        // truncated instant rather than the sub-second one.
        let expires_at = truncate_to_seconds(Utc::now() + self.policy.token_lifetime())?;

        let wire = WireClaims {
            user_id: account.id.as_uuid(),
            username: account.login_name.clone(),
            role: account.role.as_str().to_owned(),
            department: account.department.clone(),
            exp: expires_at.timestamp(),
        };

        let token = self.sign(&wire)?;

        Ok(IssuedToken {
            token,
            claims: SessionClaims {
                account_id: account.id,
                login_name: account.login_name.clone(),
                role: account.role,
                department: account.department.clone(),
                expires_at,
            },
        })
    }

    fn verify(&self, token: &str, ignore_expiry: bool) -> AppResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = !ignore_expiry;

        let data = decode::<WireClaims>(token, &self.decoding_key, &validation).map_err(
            |error| match error.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenInvalid(error.to_string()),
            },
        )?;

        let wire = data.claims;
        let role = Role::from_str(&wire.role)
            .map_err(|_| AppError::TokenInvalid(format!("unknown role claim '{}'", wire.role)))?;
        let expires_at = DateTime::<Utc>::from_timestamp(wire.exp, 0)
            .ok_or_else(|| AppError::TokenInvalid("expiry claim out of range".to_owned()))?;

        Ok(SessionClaims {
            account_id: AccountId::from_uuid(wire.user_id),
            login_name: wire.username,
            role,
            department: wire.department,
            expires_at,
        })
    }
}

fn truncate_to_seconds(instant: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(instant.timestamp(), 0)
        .ok_or_else(|| AppError::Internal("timestamp out of range".to_owned()))
}
