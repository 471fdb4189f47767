//! Request and response types for the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use squadquest_core::{ActivityEntry, FeedbackTag, ItemKind, Quest, ShopItem, UserProfile};
use squadquest_engine::{LeaderboardEntry, WeeklyResetOutcome};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// BOUNTY
// ============================================================================

/// Response to a successful bounty claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClaimBountyResponse {
    pub success: bool,
    pub message: String,
    pub earned_xp: i64,
    pub streak: i32,
    pub new_level: i32,
}

// ============================================================================
// PROFILE
// ============================================================================

/// Public profile as served to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub name: String,
    pub city: String,
    pub xp: i64,
    pub lifetime_xp: i64,
    pub this_week_xp: i64,
    pub level: i32,
    pub daily_streak: i32,
    pub badges: Vec<String>,
    pub streak_freezes: i64,
    pub equipped_frame: Option<String>,
    pub active_border: Option<String>,
    pub quests_completed: i32,
    pub last_claimed_at: Option<DateTime<Utc>>,
    pub boost_expires_at: Option<DateTime<Utc>>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            user_id: p.user_id,
            name: p.name,
            city: p.city,
            xp: p.xp,
            lifetime_xp: p.lifetime_xp,
            this_week_xp: p.this_week_xp,
            level: p.level,
            daily_streak: p.daily_streak,
            badges: p.badges.into_iter().collect(),
            streak_freezes: p.streak_freezes,
            equipped_frame: p.equipped_frame,
            active_border: p.active_border,
            quests_completed: p.quests_completed,
            last_claimed_at: p.last_claimed_at,
            boost_expires_at: p.boost_expires_at,
        }
    }
}

// ============================================================================
// QUESTS
// ============================================================================

/// Request to create a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateQuestRequest {
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    pub max_players: i32,
    #[serde(default)]
    pub is_private: bool,
    pub secret_code: Option<String>,
    pub start_time: DateTime<Utc>,
}

/// Quest as served to clients. The secret code is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestResponse {
    pub quest_id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    #[schema(value_type = String)]
    pub status: squadquest_core::QuestStatus,
    pub max_players: i32,
    pub members_count: i32,
    pub is_private: bool,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Quest> for QuestResponse {
    fn from(q: Quest) -> Self {
        Self {
            quest_id: q.quest_id,
            host_id: q.host_id,
            title: q.title,
            description: q.description,
            city: q.city,
            status: q.status,
            max_players: q.max_players,
            members_count: q.members_count,
            is_private: q.is_private,
            start_time: q.start_time,
            created_at: q.created_at,
        }
    }
}

/// Request to join a quest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JoinQuestRequest {
    #[serde(default)]
    pub secret_code: Option<String>,
}

/// Response to a join attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JoinQuestResponse {
    pub success: bool,
    pub already_member: bool,
    pub members_count: i32,
}

/// Request to finalize a quest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FinalizeQuestRequest {
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Response to finalizing a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FinalizeQuestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub already_claimed: bool,
    pub earned_xp: i64,
    pub new_level: i32,
    pub bonuses: Vec<String>,
    pub new_badges: Vec<String>,
}

/// Request to submit a peer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VibeCheckRequest {
    /// Target user id to the tags awarded to them.
    #[schema(value_type = Object)]
    pub reviews: BTreeMap<Uuid, Vec<FeedbackTag>>,
}

/// Response to a peer review submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VibeCheckResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub already_submitted: bool,
    pub earned_xp: i64,
}

/// Response to leaving a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LeaveQuestResponse {
    pub success: bool,
    /// XP deducted for a late leave (0 when outside the grace window).
    pub penalty_xp: i64,
}

// ============================================================================
// LEADERBOARD / ACTIVITY
// ============================================================================

/// One weekly leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub name: String,
    pub this_week_xp: i64,
    pub xp: i64,
    pub level: i32,
    pub badges: Vec<String>,
}

impl From<LeaderboardEntry> for LeaderboardRow {
    fn from(e: LeaderboardEntry) -> Self {
        Self {
            user_id: e.user_id,
            name: e.name,
            this_week_xp: e.this_week_xp,
            xp: e.xp,
            level: e.level,
            badges: e.badges.into_iter().collect(),
        }
    }
}

/// Weekly leaderboard response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardRow>,
    pub total: i32,
}

/// One activity feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActivityRow {
    pub activity_id: Uuid,
    #[schema(value_type = String)]
    pub kind: squadquest_core::ActivityKind,
    pub user_id: Uuid,
    pub user_name: String,
    pub target: String,
    pub earned_xp: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityEntry> for ActivityRow {
    fn from(e: ActivityEntry) -> Self {
        Self {
            activity_id: e.activity_id,
            kind: e.kind,
            user_id: e.user_id,
            user_name: e.user_name,
            target: e.target,
            earned_xp: e.earned_xp,
            created_at: e.created_at,
        }
    }
}

/// Activity feed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActivityResponse {
    pub entries: Vec<ActivityRow>,
}

// ============================================================================
// SHOP
// ============================================================================

/// Shop item as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ShopItemRow {
    pub item_id: String,
    pub name: String,
    pub cost: i64,
    #[schema(value_type = String)]
    pub kind: ItemKind,
}

impl From<ShopItem> for ShopItemRow {
    fn from(i: ShopItem) -> Self {
        Self {
            item_id: i.item_id,
            name: i.name,
            cost: i.cost,
            kind: i.kind,
        }
    }
}

/// Shop listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ShopItemsResponse {
    pub items: Vec<ShopItemRow>,
}

/// Request to buy a shop item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BuyRequest {
    pub item_id: String,
}

/// Response to a purchase. Kind-specific fields are present only when they
/// apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BuyResponse {
    pub success: bool,
    pub new_balance: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

// ============================================================================
// ADMIN
// ============================================================================

/// Admin request to upsert a shop item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminShopItemRequest {
    pub item_id: String,
    pub name: String,
    pub cost: i64,
    #[schema(value_type = String)]
    pub kind: ItemKind,
    pub payload: Option<String>,
}

/// Admin request to load coupon codes for a voucher item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminCouponsRequest {
    pub item_id: String,
    pub codes: Vec<String>,
}

/// One weekly winner in the admin reset response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WeeklyWinnerRow {
    pub user_id: Uuid,
    pub name: String,
    pub rank: usize,
    pub this_week_xp: i64,
}

/// Response to triggering the weekly reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WeeklyResetResponse {
    pub success: bool,
    pub already_current: bool,
    pub users_reset: usize,
    pub winners: Vec<WeeklyWinnerRow>,
}

impl From<WeeklyResetOutcome> for WeeklyResetResponse {
    fn from(o: WeeklyResetOutcome) -> Self {
        Self {
            success: true,
            already_current: o.already_current,
            users_reset: o.users_reset,
            winners: o
                .winners
                .into_iter()
                .map(|w| WeeklyWinnerRow {
                    user_id: w.user_id,
                    name: w.name,
                    rank: w.rank,
                    this_week_xp: w.this_week_xp,
                })
                .collect(),
        }
    }
}

// ============================================================================
// HEALTH
// ============================================================================

/// Liveness and store statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub documents: usize,
    pub committed_transactions: u64,
    pub conflicts: u64,
}
