//! OpenAPI documentation for the Squad Quest API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::types::{
    ActivityResponse, ActivityRow, AdminCouponsRequest, AdminShopItemRequest, BuyRequest,
    BuyResponse, ClaimBountyResponse, CreateQuestRequest, FinalizeQuestRequest,
    FinalizeQuestResponse, HealthResponse, JoinQuestRequest, JoinQuestResponse,
    LeaderboardResponse, LeaderboardRow, LeaveQuestResponse, ProfileResponse, QuestResponse,
    ShopItemRow, ShopItemsResponse, VibeCheckRequest, VibeCheckResponse, WeeklyResetResponse,
    WeeklyWinnerRow,
};

/// OpenAPI document for all REST endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Squad Quest API",
        description = "Gamified local-meetup backend: quests, XP, streaks, shop and weekly leaderboards."
    ),
    paths(
        crate::routes::bounty::claim_bounty,
        crate::routes::profile::get_profile,
        crate::routes::quest::create_quest,
        crate::routes::quest::get_quest,
        crate::routes::quest::join_quest,
        crate::routes::quest::finalize_quest,
        crate::routes::quest::vibe_check,
        crate::routes::quest::leave_quest,
        crate::routes::quest::edit_quest,
        crate::routes::quest::delete_quest,
        crate::routes::leaderboard::weekly_leaderboard,
        crate::routes::leaderboard::activity_feed,
        crate::routes::shop::list_items,
        crate::routes::shop::buy_item,
        crate::routes::admin::reset_weekly_xp,
        crate::routes::admin::upsert_shop_item,
        crate::routes::admin::load_coupons,
        crate::routes::health::health,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        ClaimBountyResponse,
        ProfileResponse,
        CreateQuestRequest,
        QuestResponse,
        JoinQuestRequest,
        JoinQuestResponse,
        FinalizeQuestRequest,
        FinalizeQuestResponse,
        VibeCheckRequest,
        VibeCheckResponse,
        LeaveQuestResponse,
        LeaderboardRow,
        LeaderboardResponse,
        ActivityRow,
        ActivityResponse,
        ShopItemRow,
        ShopItemsResponse,
        BuyRequest,
        BuyResponse,
        AdminShopItemRequest,
        AdminCouponsRequest,
        WeeklyWinnerRow,
        WeeklyResetResponse,
        HealthResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer token security scheme referenced by the routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/api/v1/bounty/claim"));
        assert!(json.contains("/api/v1/leaderboard/weekly"));
        assert!(json.contains("/health"));
    }
}
