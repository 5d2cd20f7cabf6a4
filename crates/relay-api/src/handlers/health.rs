//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use relay_service::{HealthResponse, ReadinessResponse};

use crate::state::AppState;

/// Liveness probe
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Readiness probe: Postgres and Redis must both answer
///
/// GET /health/ready
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let probe = state.readiness();
    let (database, redis) = tokio::join!(probe.database_ready(), probe.cache_ready());

    let response = ReadinessResponse::ready(database, redis);
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        tracing::warn!(database, redis, "Readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
