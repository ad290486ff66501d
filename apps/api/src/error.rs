use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use opmetrics_core::AppError;

/// Machine-readable code attached to expired-session refusals.
pub const SESSION_EXPIRED_CODE: &str = "SESSION_EXPIRED";

/// API error payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locked_until: Option<DateTime<Utc>>,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = match self.0 {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, plain(message)),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, plain(message)),
            AppError::Conflict(message) => (StatusCode::CONFLICT, plain(message)),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, plain(message)),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, plain(message)),
            AppError::AccountLocked { locked_until } => (
                StatusCode::LOCKED,
                ErrorResponse {
                    error: "account temporarily locked due to repeated failed attempts".to_owned(),
                    code: None,
                    redirect_to: None,
                    locked_until: Some(locked_until),
                },
            ),
            AppError::TokenInvalid(_) => (
                StatusCode::UNAUTHORIZED,
                plain("invalid authentication token".to_owned()),
            ),
            // Expired sessions carry a code and a redirect target so
            // the client can route back to the login screen.
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "session expired".to_owned(),
                    code: Some(SESSION_EXPIRED_CODE.to_owned()),
                    redirect_to: Some("/login".to_owned()),
                    locked_until: None,
                },
            ),
            AppError::Internal(message) => {
                tracing::error!(%message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    plain("internal server error".to_owned()),
                )
            }
        };

        (status, Json(payload)).into_response()
    }
}

fn plain(error: String) -> ErrorResponse {
    ErrorResponse {
        error,
        code: None,
        redirect_to: None,
        locked_until: None,
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
