//! Squad Quest Core - Entity Types and Reward Math
//!
//! Pure data structures and pure functions. All other crates depend on this.
//! This crate contains no I/O and no async - documents, enums, the leveling
//! calculator, the reward rule table and the shared error taxonomy.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod level;

pub use config::{week_start, RewardRules, WeeklyTier};
pub use entities::{
    ActivityEntry, CouponCode, Quest, QuestMember, Redemption, ShopItem, UserProfile, UserStats,
    Verification, WeeklyMeta,
};
pub use enums::{ActivityKind, FeedbackTag, ItemKind, MemberRole, QuestStatus};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use level::{level_from_total_xp, xp_at_level_start, xp_to_advance, LevelProgress};

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone. Timestamps are always server-assigned.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

// ============================================================================
// BADGE IDS
// ============================================================================

/// Well-known badge identifiers granted by the reward engine.
pub mod badges {
    /// Granted on a user's first-ever quest completion. Permanent.
    pub const FIRST_MISSION: &str = "first-mission";
    /// Granted when a quest is finalized inside the punctuality window.
    pub const EARLY_BIRD: &str = "early-bird";
    /// Granted when a quest is finalized with photo evidence.
    pub const SHUTTERBUG: &str = "shutterbug";
    /// Granted when a quest is finalized during a Showdown window.
    pub const SHOWDOWN_VICTOR: &str = "showdown-victor";
    /// Weekly leaderboard rank badges, rank 1 through 3.
    pub const WEEKLY_RANK: [&str; 3] = ["weekly-champion", "weekly-runner-up", "weekly-third"];
}

/// Well-known consumable inventory keys.
pub mod items {
    /// Consumable that protects a daily streak across a missed day.
    pub const STREAK_FREEZE: &str = "streak_freeze";
    /// Consumable XP boost token.
    pub const XP_BOOST: &str = "xp_boost";
}
