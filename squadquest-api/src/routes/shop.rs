//! Shop routes.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{BuyRequest, BuyResponse, ShopItemsResponse},
};
use squadquest_engine::PurchaseDetail;

/// GET /api/v1/shop/items - List purchasable items
#[utoipa::path(
    get,
    path = "/api/v1/shop/items",
    tag = "Shop",
    responses(
        (status = 200, description = "Shop catalog", body = ShopItemsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_items(
    State(state): State<AppState>,
    AuthExtractor(_auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let items = state.engine.list_shop_items().await?;
    Ok(Json(ShopItemsResponse {
        items: items.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/shop/buy - Buy an item
///
/// Spends the wallet balance only; lifetime and weekly XP are never touched
/// by a purchase.
#[utoipa::path(
    post,
    path = "/api/v1/shop/buy",
    tag = "Shop",
    request_body = BuyRequest,
    responses(
        (status = 200, description = "Purchase complete", body = BuyResponse),
        (status = 403, description = "Insufficient XP / already owned", body = ApiError),
        (status = 503, description = "Out of stock", body = ApiError),
        (status = 404, description = "Unknown item", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn buy_item(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<BuyRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    state
        .engine
        .ensure_user(auth.user_id, &auth.name, &auth.city, now)
        .await?;
    let outcome = state.engine.purchase(auth.user_id, &req.item_id, now).await?;

    let mut response = BuyResponse {
        success: true,
        new_balance: outcome.new_balance,
        message: "Purchase complete".to_string(),
        ..BuyResponse::default()
    };
    match outcome.detail {
        PurchaseDetail::Consumable { item, count } => {
            response.message = format!("You now hold {} of {}", count, item);
            response.item_count = Some(count);
        }
        PurchaseDetail::Voucher {
            code,
            redemption_id,
            expires_at,
        } => {
            response.message = "Voucher redeemed".to_string();
            response.code = Some(code);
            response.redemption_id = Some(redemption_id);
            response.expires_at = Some(expires_at);
        }
        PurchaseDetail::Cosmetic { frame } => {
            response.message = format!("Frame {} equipped", frame);
            response.frame = Some(frame);
        }
        PurchaseDetail::Badge { badge } => {
            response.message = format!("Badge {} unlocked", badge);
            response.badge = Some(badge);
        }
    }
    Ok(Json(response))
}

/// Create the shop routes router.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/items", axum::routing::get(list_items))
        .route("/buy", axum::routing::post(buy_item))
        .with_state(state)
}
