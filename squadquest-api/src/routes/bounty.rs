//! Daily bounty routes.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::ClaimBountyResponse,
};

/// POST /api/v1/bounty/claim - Claim the daily bounty
#[utoipa::path(
    post,
    path = "/api/v1/bounty/claim",
    tag = "Bounty",
    responses(
        (status = 200, description = "Bounty claimed", body = ClaimBountyResponse),
        (status = 403, description = "Cooldown active", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn claim_bounty(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    state
        .engine
        .ensure_user(auth.user_id, &auth.name, &auth.city, now)
        .await?;
    let outcome = state.engine.claim_daily_bounty(auth.user_id, now).await?;

    Ok(Json(ClaimBountyResponse {
        success: true,
        message: format!("+{} XP! Streak: {}", outcome.earned_xp, outcome.streak),
        earned_xp: outcome.earned_xp,
        streak: outcome.streak,
        new_level: outcome.new_level,
    }))
}

/// Create the bounty routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/claim", axum::routing::post(claim_bounty))
        .with_state(state)
}
