//! Privileged admin routes.
//!
//! Gated by the `x-admin-secret` header instead of bearer auth; the secret
//! is process configuration, never a user credential.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::{
    auth::verify_admin_secret,
    error::{ApiError, ApiResult},
    state::AppState,
    types::{AdminCouponsRequest, AdminShopItemRequest, WeeklyResetResponse},
};
use squadquest_core::ShopItem;

/// Header carrying the admin secret.
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

fn check_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|h| h.to_str().ok());
    verify_admin_secret(&state.auth, provided)
}

/// POST /api/v1/admin/reset-weekly-xp - Run the weekly reset synchronously
#[utoipa::path(
    post,
    path = "/api/v1/admin/reset-weekly-xp",
    tag = "Admin",
    responses(
        (status = 200, description = "Reset ran (or was already current)", body = WeeklyResetResponse),
        (status = 403, description = "Bad admin secret", body = ApiError),
    )
)]
pub async fn reset_weekly_xp(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    check_admin(&state, &headers)?;
    let outcome = state.engine.run_weekly_reset(Utc::now()).await?;
    Ok(Json(WeeklyResetResponse::from(outcome)))
}

/// POST /api/v1/admin/shop-items - Upsert a shop item
#[utoipa::path(
    post,
    path = "/api/v1/admin/shop-items",
    tag = "Admin",
    request_body = AdminShopItemRequest,
    responses(
        (status = 204, description = "Item stored"),
        (status = 403, description = "Bad admin secret", body = ApiError),
    )
)]
pub async fn upsert_shop_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AdminShopItemRequest>,
) -> ApiResult<StatusCode> {
    check_admin(&state, &headers)?;
    if req.cost < 0 {
        return Err(ApiError::invalid_input("cost must be non-negative"));
    }
    state
        .engine
        .upsert_shop_item(&ShopItem {
            item_id: req.item_id,
            name: req.name,
            cost: req.cost,
            kind: req.kind,
            payload: req.payload,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/coupons - Load coupon codes for a voucher item
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    tag = "Admin",
    request_body = AdminCouponsRequest,
    responses(
        (status = 200, description = "Codes loaded"),
        (status = 403, description = "Bad admin secret", body = ApiError),
        (status = 404, description = "Unknown item", body = ApiError),
    )
)]
pub async fn load_coupons(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AdminCouponsRequest>,
) -> ApiResult<impl IntoResponse> {
    check_admin(&state, &headers)?;
    let loaded = state.engine.add_coupons(&req.item_id, &req.codes).await?;
    Ok(Json(serde_json::json!({ "success": true, "loaded": loaded })))
}

/// Create the admin routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/reset-weekly-xp", axum::routing::post(reset_weekly_xp))
        .route("/shop-items", axum::routing::post(upsert_shop_item))
        .route("/coupons", axum::routing::post(load_coupons))
        .with_state(state)
}
