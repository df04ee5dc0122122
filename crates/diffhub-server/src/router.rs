use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all diffhub endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route(
            "/v1/comparisons",
            post(handler::submit_handler).get(handler::list_handler),
        )
        .route("/v1/comparisons/:id", get(handler::result_handler))
        .route("/v1/branches", get(handler::branches_handler))
        .route("/v1/events", get(handler::events_handler))
        .route(
            "/v1/connections/:id/subscribe",
            post(handler::subscribe_handler).delete(handler::unsubscribe_handler),
        )
        .route("/v1/connections/:id/heartbeat", post(handler::heartbeat_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
