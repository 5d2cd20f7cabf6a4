//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, messages};
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new().nest("/messages", message_routes())
}

fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(messages::get_history))
        .route("/conversations", get(messages::get_conversations))
        .route("/reaction", post(messages::add_reaction))
}
