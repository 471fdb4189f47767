//! Enumerations shared across the Squad Quest crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestStatus {
    /// Accepting members.
    Open,
    /// No longer joinable; rewards may still be claimed.
    Closed,
    /// Finished.
    Completed,
    /// Abandoned by the host.
    Cancelled,
}

/// Role of a member within a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberRole {
    Host,
    Member,
}

/// Category of a shop item; determines the purchase effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Profile frame; unique per user, auto-equipped on purchase.
    Cosmetic,
    /// Redeems one coupon code from a finite pool.
    Voucher,
    /// Permanent badge; unique per user.
    Badge,
    /// Stackable counter in the inventory (streak freeze, XP boost).
    Consumable,
}

/// Kind of a global activity-feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    BountyClaimed,
    QuestCompleted,
    QuestLeft,
    BadgeUnlocked,
    VibeCheck,
    ShopPurchase,
    WeeklyReward,
}

/// Qualitative peer-review tags a reviewer can award to a teammate.
///
/// Each tag pays a small XP grant to the target and increments a per-tag
/// feedback counter; crossing the counter threshold unlocks the tag's badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeedbackTag {
    Leader,
    Reliable,
    Hype,
    Strategist,
}

impl FeedbackTag {
    /// Badge unlocked when this tag's feedback counter reaches its threshold.
    pub fn badge_id(&self) -> &'static str {
        match self {
            FeedbackTag::Leader => "born-leader",
            FeedbackTag::Reliable => "rock-solid",
            FeedbackTag::Hype => "hype-machine",
            FeedbackTag::Strategist => "mastermind",
        }
    }

    /// All tags, for iteration in tests and seeds.
    pub fn all() -> [FeedbackTag; 4] {
        [
            FeedbackTag::Leader,
            FeedbackTag::Reliable,
            FeedbackTag::Hype,
            FeedbackTag::Strategist,
        ]
    }
}

impl fmt::Display for FeedbackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_tag_badges_are_distinct() {
        let mut badges: Vec<&str> = FeedbackTag::all().iter().map(|t| t.badge_id()).collect();
        badges.sort();
        badges.dedup();
        assert_eq!(badges.len(), FeedbackTag::all().len());
    }

    #[test]
    fn test_enum_serde_round_trip() -> Result<(), serde_json::Error> {
        let status = QuestStatus::Open;
        let json = serde_json::to_string(&status)?;
        assert_eq!(json, "\"Open\"");
        let back: QuestStatus = serde_json::from_str(&json)?;
        assert_eq!(back, status);

        let kind: ItemKind = serde_json::from_str("\"Voucher\"")?;
        assert_eq!(kind, ItemKind::Voucher);
        Ok(())
    }

    #[test]
    fn test_feedback_tag_as_map_key() -> Result<(), serde_json::Error> {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<FeedbackTag, i64> = BTreeMap::new();
        counts.insert(FeedbackTag::Leader, 3);
        let json = serde_json::to_string(&counts)?;
        assert!(json.contains("Leader"));
        let back: BTreeMap<FeedbackTag, i64> = serde_json::from_str(&json)?;
        assert_eq!(back.get(&FeedbackTag::Leader), Some(&3));
        Ok(())
    }
}
