//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/rooms", room_routes())
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::user::register_user))
        .route("/{alias}", get(handlers::user::get_user))
}

fn room_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::room::create_room).get(handlers::room::list_rooms),
        )
        .route(
            "/{name}",
            get(handlers::room::get_room).delete(handlers::room::delete_room),
        )
        .route(
            "/{name}/messages",
            post(handlers::message::send_message).get(handlers::message::get_messages),
        )
        .route(
            "/{name}/messages/search",
            get(handlers::message::search_message),
        )
}
