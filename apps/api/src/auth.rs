//! Authentication endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::Utc;

use opmetrics_domain::SessionClaims;

use crate::dto::{LoginRequest, LoginResponse, MessageResponse, SessionStatusResponse};
use crate::error::ApiResult;
use crate::middleware::request_context;
use crate::state::AppState;

pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let context = request_context(&headers);

    let session = state
        .auth_service
        .authenticate(&payload.username, &payload.password, &context)
        .await?;

    Ok(Json(LoginResponse::from_session(
        session,
        state.session_policy.session_seconds(),
    )))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<MessageResponse>> {
    let context = request_context(&headers);

    state.auth_service.logout(&claims, &context).await;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_owned(),
    }))
}

pub async fn session_status_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let now = Utc::now();

    Ok(Json(SessionStatusResponse {
        expires_at: claims.expires_at,
        remaining_seconds: claims.remaining_seconds(now).max(0),
        timeout_warning: claims.in_warning_window(now, &state.session_policy),
    }))
}
