//! API Router configuration

use super::app_state::AppState;
use super::health::health_check;
use super::llm_websocket::llm_websocket_handler;
use super::metrics_handler::metrics_handler;
use super::webhook::webhook_handler;
use super::ws_handler::ws_handler;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router. `/metrics` is only mounted when a handle is given.
pub fn build_router(state: AppState, prometheus_handle: Option<PrometheusHandle>) -> Router {
    let relay_routes = Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(webhook_handler))
        .route("/llm-websocket/:call_id", get(llm_websocket_handler))
        .route("/realtime", get(ws_handler))
        .with_state(state);

    let mut router = Router::new().merge(relay_routes);

    // Metrics route (separate state)
    if let Some(handle) = prometheus_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
