//! Non-auth endpoints.

use axum::Json;
use axum::extract::State;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let directory = match state.ldap_directory.as_deref() {
        None => "disabled",
        Some(directory) if directory.is_available() => "available",
        Some(_) => "unavailable",
    };

    Json(HealthResponse {
        status: "ok",
        directory,
    })
}
