use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use opmetrics_application::AuditEvent;
use opmetrics_core::{AppError, RequestContext};
use opmetrics_domain::AuditAction;

use crate::error::ApiResult;
use crate::state::AppState;

/// Response header carrying the remaining session seconds once a
/// request lands inside the warning window.
pub const SESSION_WARNING_HEADER: &str = "x-session-warning";

/// Bearer-token session guard.
///
/// Decodes the token with expiry checking disabled so an expired but
/// otherwise valid token can be told apart from a forged one: the
/// former gets a session-expired refusal and an audit entry, the
/// latter a plain invalid-token refusal.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let claims = state.token_issuer.verify(&token, true)?;

    let now = Utc::now();
    if claims.is_expired(now) {
        state
            .audit_trail
            .record(AuditEvent::for_account(
                AuditAction::SessionExpired,
                Some(claims.account_id),
                &request_context(request.headers()),
                None,
            ))
            .await;

        return Err(AppError::TokenExpired.into());
    }

    let remaining = claims.remaining_seconds(now);
    let in_warning = claims.in_warning_window(now, &state.session_policy);

    request.extensions_mut().insert(claims);
    let mut response = next.run(request).await;

    if in_warning && let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        response.headers_mut().insert(SESSION_WARNING_HEADER, value);
    }

    Ok(response)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then(|| token.to_owned())
}

pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    RequestContext {
        ip_address,
        user_agent,
    }
}
