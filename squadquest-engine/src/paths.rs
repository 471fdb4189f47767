//! Document addressing for every persisted collection.

use squadquest_store::{collections, DocPath};
use uuid::Uuid;

pub fn user(user_id: Uuid) -> DocPath {
    DocPath::new(collections::USERS, user_id)
}

pub fn user_stats(user_id: Uuid) -> DocPath {
    DocPath::new(collections::USER_STATS, user_id)
}

pub fn quest(quest_id: Uuid) -> DocPath {
    DocPath::new(collections::QUESTS, quest_id)
}

/// Membership records are keyed by quest and user, one per pair.
pub fn quest_member(quest_id: Uuid, user_id: Uuid) -> DocPath {
    DocPath::new(collections::QUEST_MEMBERS, format!("{}:{}", quest_id, user_id))
}

/// Verification records share the membership keying scheme.
pub fn verification(quest_id: Uuid, user_id: Uuid) -> DocPath {
    DocPath::new(collections::VERIFICATIONS, format!("{}:{}", quest_id, user_id))
}

pub fn activity(activity_id: Uuid) -> DocPath {
    DocPath::new(collections::GLOBAL_ACTIVITY, activity_id)
}

pub fn coupon(coupon_id: Uuid) -> DocPath {
    DocPath::new(collections::COUPON_CODES, coupon_id)
}

pub fn redemption(redemption_id: Uuid) -> DocPath {
    DocPath::new(collections::REDEMPTIONS, redemption_id)
}

pub fn shop_item(item_id: &str) -> DocPath {
    DocPath::new(collections::SHOP_ITEMS, item_id)
}

/// Singleton marker for the weekly reset cycle.
pub fn weekly_meta() -> DocPath {
    DocPath::new(collections::META, "weekly")
}
