use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::interface_adapters::handlers::tickets::{join, leave, poll};
use crate::interface_adapters::protocol::HealthResponse;
use crate::interface_adapters::state::AppState;

// Build the HTTP router for the matchmaking API.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/matchmaking/join", post(join))
        .route("/matchmaking/tickets/{ticket_id}", get(poll).delete(leave))
        .route("/health", get(health))
        .with_state(state)
}

// Liveness probe for deploy tooling.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
