//! Core entity structures.
//!
//! Typed records for every persisted document. Defaults are applied by the
//! constructors, so readers never re-derive them with scattered fallbacks.

use crate::{
    level::level_from_total_xp,
    enums::{ActivityKind, FeedbackTag, ItemKind, MemberRole, QuestStatus},
    EntityId, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ============================================================================
// USERS
// ============================================================================

/// Public user record: identity plus every leaderboard-visible field.
///
/// All mutations go through server-side transactions; the client never
/// writes this document directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub city: String,
    /// Spendable wallet balance. Consumed by shop purchases only.
    pub xp: i64,
    /// Total XP ever earned; source of truth for the level.
    pub lifetime_xp: i64,
    /// XP earned since the last weekly reset; drives the weekly leaderboard.
    pub this_week_xp: i64,
    /// Cached level, always derived from `lifetime_xp` via the calculator.
    pub level: i32,
    pub reliability_score: f64,
    pub daily_streak: i32,
    pub badges: BTreeSet<String>,
    /// Public mirror of the streak-freeze consumable count.
    pub streak_freezes: i64,
    pub equipped_frame: Option<String>,
    pub active_border: Option<String>,
    pub quests_completed: i32,
    pub last_claimed_at: Option<Timestamp>,
    pub last_weekly_reset: Timestamp,
    /// Expiry of the rank-1 weekly XP boost, when one is active.
    pub boost_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserProfile {
    pub fn new(user_id: Uuid, name: impl Into<String>, city: impl Into<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            name: name.into(),
            city: city.into(),
            xp: 0,
            lifetime_xp: 0,
            this_week_xp: 0,
            level: 1,
            reliability_score: 100.0,
            daily_streak: 0,
            badges: BTreeSet::new(),
            streak_freezes: 0,
            equipped_frame: None,
            active_border: None,
            quests_completed: 0,
            last_claimed_at: None,
            last_weekly_reset: crate::config::week_start(now),
            boost_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy every mirrored field from the private stats record.
    ///
    /// Called just before both documents are staged in the same transaction;
    /// this is the single place the dual-write invariant is enforced.
    pub fn sync_mirrored(&mut self, stats: &UserStats) {
        self.xp = stats.xp;
        self.lifetime_xp = stats.lifetime_xp;
        self.this_week_xp = stats.this_week_xp;
        self.level = stats.level;
        self.daily_streak = stats.daily_streak;
        self.badges = stats.badges.clone();
        self.last_claimed_at = stats.last_claimed_at;
        self.last_weekly_reset = stats.last_weekly_reset;
        self.streak_freezes = stats.inventory.get(crate::items::STREAK_FREEZE).copied().unwrap_or(0);
    }
}

/// Private mirror of a user: sensitive and internal fields.
///
/// Source of truth for badges, inventory and feedback counters. Every
/// transaction that touches a field mirrored on [`UserProfile`] writes both
/// records atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub xp: i64,
    pub lifetime_xp: i64,
    pub this_week_xp: i64,
    pub level: i32,
    pub daily_streak: i32,
    pub last_claimed_at: Option<Timestamp>,
    pub last_weekly_reset: Timestamp,
    pub badges: BTreeSet<String>,
    pub feedback_counts: BTreeMap<FeedbackTag, i64>,
    /// Consumable counts keyed by item id (streak freezes, XP boosts).
    pub inventory: BTreeMap<String, i64>,
    pub owned_frames: BTreeSet<String>,
    pub updated_at: Timestamp,
}

impl UserStats {
    pub fn new(user_id: Uuid, now: Timestamp) -> Self {
        Self {
            user_id,
            xp: 0,
            lifetime_xp: 0,
            this_week_xp: 0,
            level: 1,
            daily_streak: 0,
            last_claimed_at: None,
            last_weekly_reset: crate::config::week_start(now),
            badges: BTreeSet::new(),
            feedback_counts: BTreeMap::new(),
            inventory: BTreeMap::new(),
            owned_frames: BTreeSet::new(),
            updated_at: now,
        }
    }

    /// Credit earned XP to the wallet, the lifetime total and the weekly
    /// counter, then refresh the cached level.
    pub fn grant_xp(&mut self, amount: i64) {
        self.xp += amount;
        self.lifetime_xp += amount;
        self.this_week_xp += amount;
        self.recompute_level();
    }

    /// Debit the wallet only. Spending never touches lifetime or weekly XP,
    /// so a purchase can never cause a level-down or a ranking drop.
    pub fn spend(&mut self, cost: i64) {
        self.xp -= cost;
    }

    /// Deduct a leave penalty from the lifetime and weekly totals
    /// (never below zero) and refresh the cached level.
    pub fn apply_penalty(&mut self, penalty: i64) {
        self.lifetime_xp = (self.lifetime_xp - penalty).max(0);
        self.this_week_xp = (self.this_week_xp - penalty).max(0);
        self.recompute_level();
    }

    /// Recompute the cached level from lifetime XP. Returns the new level.
    pub fn recompute_level(&mut self) -> i32 {
        self.level = level_from_total_xp(self.lifetime_xp).level;
        self.level
    }

    /// Count of a consumable in the inventory.
    pub fn consumable_count(&self, item: &str) -> i64 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// Add a badge if absent. Returns true when newly unlocked.
    pub fn unlock_badge(&mut self, badge: &str) -> bool {
        self.badges.insert(badge.to_string())
    }
}

// ============================================================================
// QUESTS
// ============================================================================

/// A location-based meetup quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: EntityId,
    pub host_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    pub status: QuestStatus,
    pub max_players: i32,
    /// Denormalized member counter; checked and incremented in the same
    /// transaction as the membership write so joins can never overbook.
    pub members_count: i32,
    pub is_private: bool,
    pub secret_code: Option<String>,
    pub start_time: Timestamp,
    /// One-shot flag so the "almost full" host alert fires only once.
    pub hot_zone_notified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Quest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quest_id: EntityId,
        host_id: Uuid,
        title: impl Into<String>,
        city: impl Into<String>,
        max_players: i32,
        start_time: Timestamp,
        now: Timestamp,
    ) -> Self {
        Self {
            quest_id,
            host_id,
            title: title.into(),
            description: None,
            city: city.into(),
            status: QuestStatus::Open,
            max_players,
            members_count: 0,
            is_private: false,
            secret_code: None,
            start_time,
            hot_zone_notified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_full(&self) -> bool {
        self.members_count >= self.max_players
    }

    /// Whether membership has crossed the hot-zone capacity fraction.
    /// Strict: sitting exactly at the threshold does not count as crossed.
    pub fn hot_zone_reached(&self, threshold: f64) -> bool {
        self.max_players > 0
            && (self.members_count as f64) / (self.max_players as f64) > threshold
    }
}

/// Membership record, one per (quest, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestMember {
    pub quest_id: EntityId,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: Timestamp,
    /// Set once the member has submitted their peer review for this quest.
    pub vibe_checked: bool,
}

impl QuestMember {
    pub fn new(quest_id: EntityId, user_id: Uuid, role: MemberRole, now: Timestamp) -> Self {
        Self {
            quest_id,
            user_id,
            role,
            joined_at: now,
            vibe_checked: false,
        }
    }
}

/// Completion/reward record, one per (quest, user).
///
/// `rewarded` is the at-most-once marker: it is written to true exactly once,
/// inside the same transaction that pays out the XP. Any later attempt sees
/// it set and short-circuits without paying again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub quest_id: EntityId,
    pub user_id: Uuid,
    pub completed: bool,
    pub rewarded: bool,
    pub earned_xp: i64,
    pub completed_at: Option<Timestamp>,
}

// ============================================================================
// ACTIVITY / SHOP / WEEKLY
// ============================================================================

/// Append-only global feed entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub activity_id: EntityId,
    pub kind: ActivityKind,
    pub user_id: Uuid,
    pub user_name: String,
    /// What the action was about: a quest title, badge id, item id.
    pub target: String,
    pub earned_xp: i64,
    pub created_at: Timestamp,
}

impl ActivityEntry {
    pub fn new(
        kind: ActivityKind,
        user_id: Uuid,
        user_name: impl Into<String>,
        target: impl Into<String>,
        earned_xp: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            activity_id: crate::new_entity_id(),
            kind,
            user_id,
            user_name: user_name.into(),
            target: target.into(),
            earned_xp,
            created_at: now,
        }
    }
}

/// A purchasable shop item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Stable string id, e.g. "frame_neon" or "streak_freeze".
    pub item_id: String,
    pub name: String,
    pub cost: i64,
    pub kind: ItemKind,
    /// Kind-specific payload: frame id, badge id or consumable key.
    /// Falls back to `item_id` when absent.
    pub payload: Option<String>,
}

impl ShopItem {
    /// The frame/badge/consumable key this item grants.
    pub fn grant_key(&self) -> &str {
        self.payload.as_deref().unwrap_or(&self.item_id)
    }
}

/// One coupon code in a voucher item's finite pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponCode {
    pub coupon_id: EntityId,
    pub item_id: String,
    pub code: String,
    pub is_used: bool,
    pub used_by: Option<Uuid>,
    pub used_at: Option<Timestamp>,
}

impl CouponCode {
    pub fn new(item_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            coupon_id: crate::new_entity_id(),
            item_id: item_id.into(),
            code: code.into(),
            is_used: false,
            used_by: None,
            used_at: None,
        }
    }
}

/// Record of a claimed voucher code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub redemption_id: EntityId,
    pub user_id: Uuid,
    pub item_id: String,
    pub code: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// Singleton marker for the weekly reset cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyMeta {
    /// Start of the week the current counters belong to.
    pub last_reset_at: Timestamp,
}
