//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// Pings the database and reports the result. Always answers 200 so probes
/// can read the body.
///
/// ```json
/// { "status": "healthy", "database": "healthy" }
/// ```
#[instrument(skip_all, name = "rooms.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.rooms.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(target: "rooms.health", error = %e, "Database ping failed");
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: Some(status.to_string()),
    })
}
