//! Leaderboard and activity feed routes.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{ActivityResponse, LeaderboardResponse},
};

/// Query parameters for the weekly leaderboard.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct LeaderboardQuery {
    /// Filter to a single city.
    pub city: Option<String>,
}

/// GET /api/v1/leaderboard/weekly - Weekly leaderboard
///
/// Lazily triggers the weekly reset when the stored marker is stale, so the
/// board never shows counters from a finished week.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard/weekly",
    tag = "Leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Top users by weekly XP", body = LeaderboardResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn weekly_leaderboard(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<impl IntoResponse> {
    let entries = state
        .engine
        .weekly_leaderboard(
            query.city.as_deref(),
            state.config.leaderboard_limit,
            Utc::now(),
        )
        .await?;
    let total = entries.len() as i32;
    Ok(Json(LeaderboardResponse {
        entries: entries.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// GET /api/v1/activity - Global activity feed, newest first
#[utoipa::path(
    get,
    path = "/api/v1/activity",
    tag = "Leaderboard",
    responses(
        (status = 200, description = "Recent activity", body = ActivityResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn activity_feed(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let entries = state
        .engine
        .recent_activity(state.config.activity_feed_limit)
        .await?;
    Ok(Json(ActivityResponse {
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

/// Create the leaderboard routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/weekly", axum::routing::get(weekly_leaderboard))
        .with_state(state)
}

/// Create the activity feed router.
pub fn create_activity_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(activity_feed))
        .with_state(state)
}
