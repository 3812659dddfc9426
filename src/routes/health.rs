use axum::{extract::State, Json};

use crate::{
    models::{HealthResponse, PongResponse},
    state::AppState,
};

/// Health check endpoint
///
/// # Returns
///
/// JSON with status and registry counters
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stats: state.store.stats().await,
    })
}

pub async fn ping() -> Json<PongResponse> {
    Json(PongResponse { message: "pong" })
}
