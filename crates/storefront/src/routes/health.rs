//! Health checks.

use axum::{extract::State, http::StatusCode};
use tracing::warn;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the database and the cart store. Returns 503 Service Unavailable
/// if either is unreachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        warn!(error = %e, "Readiness: database unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Err(e) = state.carts().store().ping().await {
        warn!(error = %e, "Readiness: cart store unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
