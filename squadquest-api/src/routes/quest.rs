//! Quest lifecycle routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{
        CreateQuestRequest, FinalizeQuestRequest, FinalizeQuestResponse, JoinQuestRequest,
        JoinQuestResponse, LeaveQuestResponse, QuestResponse, VibeCheckRequest, VibeCheckResponse,
    },
};
use squadquest_engine::CreateQuestParams;

/// POST /api/v1/quests - Create a quest
#[utoipa::path(
    post,
    path = "/api/v1/quests",
    tag = "Quests",
    request_body = CreateQuestRequest,
    responses(
        (status = 201, description = "Quest created", body = QuestResponse),
        (status = 403, description = "Invalid parameters", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateQuestRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    state
        .engine
        .ensure_user(auth.user_id, &auth.name, &auth.city, now)
        .await?;
    let quest = state
        .engine
        .create_quest(
            auth.user_id,
            CreateQuestParams {
                title: req.title,
                description: req.description,
                city: req.city,
                max_players: req.max_players,
                is_private: req.is_private,
                secret_code: req.secret_code,
                start_time: req.start_time,
            },
            now,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(QuestResponse::from(quest))))
}

/// GET /api/v1/quests/{id} - Get quest details
#[utoipa::path(
    get,
    path = "/api/v1/quests/{id}",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    responses(
        (status = 200, description = "Quest details", body = QuestResponse),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_quest(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let quest: squadquest_core::Quest = state
        .engine
        .store()
        .get(&squadquest_engine::paths::quest(id))?
        .ok_or_else(|| ApiError::not_found(format!("Quest {} not found", id)))?;
    Ok(Json(QuestResponse::from(quest)))
}

/// POST /api/v1/quests/{id}/join - Join a quest
#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/join",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    request_body = JoinQuestRequest,
    responses(
        (status = 200, description = "Joined (idempotent)", body = JoinQuestResponse),
        (status = 403, description = "Quest full / closed / invalid code", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<JoinQuestRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    state
        .engine
        .ensure_user(auth.user_id, &auth.name, &auth.city, now)
        .await?;
    let outcome = state
        .engine
        .join_quest(auth.user_id, id, req.secret_code.as_deref(), now)
        .await?;
    Ok(Json(JoinQuestResponse {
        success: true,
        already_member: outcome.already_member,
        members_count: outcome.members_count,
    }))
}

/// POST /api/v1/quests/{id}/finalize - Finalize and claim the quest reward
#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/finalize",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    request_body = FinalizeQuestRequest,
    responses(
        (status = 200, description = "Reward paid, or already claimed", body = FinalizeQuestResponse),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn finalize_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<FinalizeQuestRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .finalize_quest(auth.user_id, id, req.photo_url.as_deref(), Utc::now())
        .await?;
    Ok(Json(FinalizeQuestResponse {
        success: true,
        already_claimed: outcome.already_claimed,
        earned_xp: outcome.earned_xp,
        new_level: outcome.new_level,
        bonuses: outcome.bonuses,
        new_badges: outcome.new_badges,
    }))
}

/// POST /api/v1/quests/{id}/vibe-check - Submit a peer review
#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/vibe-check",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    request_body = VibeCheckRequest,
    responses(
        (status = 200, description = "Review recorded, or already submitted", body = VibeCheckResponse),
        (status = 403, description = "Not a member / invalid target", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn vibe_check(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(req): Json<VibeCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let reviews: BTreeMap<Uuid, Vec<squadquest_core::FeedbackTag>> = req.reviews;
    let outcome = state
        .engine
        .submit_vibe_check(auth.user_id, id, &reviews, Utc::now())
        .await?;
    Ok(Json(VibeCheckResponse {
        success: true,
        already_submitted: outcome.already_submitted,
        earned_xp: outcome.earned_xp,
    }))
}

/// POST /api/v1/quests/{id}/leave - Leave a quest
#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/leave",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    responses(
        (status = 200, description = "Left the quest", body = LeaveQuestResponse),
        (status = 403, description = "Host cannot leave / not a member", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.engine.leave_quest(auth.user_id, id, Utc::now()).await?;
    Ok(Json(LeaveQuestResponse {
        success: true,
        penalty_xp: outcome.penalty_xp,
    }))
}

/// PATCH /api/v1/quests/{id} - Edit a quest (host only)
#[utoipa::path(
    patch,
    path = "/api/v1/quests/{id}",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    responses(
        (status = 200, description = "Updated quest", body = QuestResponse),
        (status = 403, description = "Not the host / protected field", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn edit_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
    Json(patch): Json<serde_json::Value>,
) -> ApiResult<impl IntoResponse> {
    let patch = match patch {
        serde_json::Value::Object(map) => map,
        _ => return Err(ApiError::invalid_input("Edit body must be a JSON object")),
    };
    let quest = state
        .engine
        .edit_quest(auth.user_id, id, patch, Utc::now())
        .await?;
    Ok(Json(QuestResponse::from(quest)))
}

/// DELETE /api/v1/quests/{id} - Delete a quest (host only, cascades)
#[utoipa::path(
    delete,
    path = "/api/v1/quests/{id}",
    tag = "Quests",
    params(("id" = Uuid, Path, description = "Quest ID")),
    responses(
        (status = 204, description = "Quest deleted"),
        (status = 403, description = "Not the host", body = ApiError),
        (status = 404, description = "Quest not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_quest(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.engine.delete_quest(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the quest routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::post(create_quest))
        .route(
            "/:id",
            axum::routing::get(get_quest)
                .patch(edit_quest)
                .delete(delete_quest),
        )
        .route("/:id/join", axum::routing::post(join_quest))
        .route("/:id/finalize", axum::routing::post(finalize_quest))
        .route("/:id/vibe-check", axum::routing::post(vibe_check))
        .route("/:id/leave", axum::routing::post(leave_quest))
        .with_state(state)
}
