//! Health check routes.

use axum::{extract::State, response::IntoResponse, Json};

use crate::{error::ApiResult, state::AppState, types::HealthResponse};

/// GET /health - Liveness plus store statistics
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = state.engine.store().stats();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        documents: stats.documents,
        committed_transactions: stats.committed_transactions,
        conflicts: stats.conflicts,
    }))
}

/// Create the health routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(health))
        .with_state(state)
}
