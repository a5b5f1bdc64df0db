//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::observability::http_metrics::http_metrics_middleware;
use crate::repositories::RoomRepository;
use crate::services::MeetingLifecycle;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Meeting lifecycle engine.
    pub lifecycle: Arc<MeetingLifecycle>,

    /// Room store, used by the health check.
    pub rooms: Arc<dyn RoomRepository>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Health check endpoint (database ping)
/// - `/metrics` - Prometheus scrape endpoint
/// - `/callbacks/meetings/{id}/end` - Signed meeting-end callback
/// - HTTP metrics middleware, TraceLayer, 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/callbacks/meetings/:meeting_id/end",
            get(handlers::meeting_ended),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Count every response (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
