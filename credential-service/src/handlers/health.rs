use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::AppState;

/// Liveness of the credential API.
#[utoipa::path(
    get,
    path = "/credentials/health",
    responses(
        (status = 200, description = "Credential API is up")
    ),
    tag = "Observability"
)]
pub async fn credentials_health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Service health check including the credential store.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.credentials.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "MongoDB health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "mongodb": "up"
        }
    })))
}

/// Readiness check endpoint for K8s readiness probes.
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
