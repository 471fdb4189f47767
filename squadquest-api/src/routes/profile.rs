//! Profile routes.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::ProfileResponse,
};

/// GET /api/v1/profile - Load the caller's public profile
///
/// Loading the profile also runs the opportunistic maintenance passes:
/// streak protection (consume a freeze or reset a lapsed streak) and the
/// lazy weekly counter reset.
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    state
        .engine
        .ensure_user(auth.user_id, &auth.name, &auth.city, now)
        .await?;
    let profile = state.engine.load_profile(auth.user_id, now).await?;
    Ok(Json(ProfileResponse::from(profile)))
}

/// Create the profile routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(get_profile))
        .with_state(state)
}
