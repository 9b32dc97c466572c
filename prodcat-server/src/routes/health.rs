use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::models::HealthResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Reports the connection manager's state without touching the database.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        db: state.db().state().as_str(),
    })
}
