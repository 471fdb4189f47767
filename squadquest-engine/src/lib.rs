//! Squad Quest Engine - Reward Transactions
//!
//! Every reward-producing operation follows the same shape: within one store
//! transaction, read every document the computation needs, validate
//! preconditions before staging any write, derive the new XP/level/streak/
//! badge state, and stage writes to every denormalized copy (public user +
//! private stats + quest records + activity log). The store commits all of
//! it atomically or none. Notifications collected along the way are
//! dispatched after the commit, best-effort.
//!
//! Correctness under concurrency comes entirely from the store's optimistic
//! transactions - there is no application-level locking here.

pub mod activity;
pub mod bounty;
pub mod notify;
pub mod paths;
pub mod quest;
pub mod shop;
pub mod users;
pub mod vibe;
pub mod weekly;

pub use bounty::{BountyOutcome, StreakSyncOutcome};
pub use notify::{Notification, NotificationDispatcher, NotifyError, RecordingDispatcher, TracingDispatcher};
pub use quest::{CreateQuestParams, FinalizeOutcome, JoinOutcome, LeaveOutcome};
pub use shop::{PurchaseDetail, PurchaseOutcome};
pub use vibe::VibeOutcome;
pub use weekly::{LeaderboardEntry, WeeklyResetOutcome, WeeklyWinner};

use squadquest_core::{EngineError, EngineResult, RewardRules, Timestamp, UserProfile, UserStats};
use squadquest_store::{DocumentStore, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// The reward transaction engine.
///
/// Cheap to clone via `Arc`; shared by all request handlers and background
/// jobs.
pub struct RewardEngine {
    store: Arc<DocumentStore>,
    rules: RewardRules,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl RewardEngine {
    pub fn new(
        store: Arc<DocumentStore>,
        rules: RewardRules,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            rules,
            notifier,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn rules(&self) -> &RewardRules {
        &self.rules
    }

    /// Dispatch post-commit notifications, best-effort. Failures are logged
    /// and never surfaced: the reward already committed.
    pub(crate) async fn dispatch_all(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Err(err) = self.notifier.dispatch(&notification).await {
                tracing::warn!(error = %err, "notification delivery failed");
            }
        }
    }
}

/// Read a user's public profile and private stats from the same snapshot.
pub(crate) fn read_user_pair(
    tx: &mut Transaction<'_>,
    user_id: Uuid,
) -> EngineResult<(UserProfile, UserStats)> {
    let profile: UserProfile = tx
        .get(&paths::user(user_id))?
        .ok_or_else(|| EngineError::not_found("User", user_id))?;
    let stats: UserStats = tx
        .get(&paths::user_stats(user_id))?
        .ok_or_else(|| EngineError::not_found("User", user_id))?;
    Ok((profile, stats))
}

/// Stage both halves of a user in the current transaction.
///
/// Mirrored fields are copied from the stats record (the source of truth)
/// onto the profile right before staging, so the dual-write invariant holds
/// for every operation that goes through here.
pub(crate) fn stage_user_pair(
    tx: &mut Transaction<'_>,
    profile: &mut UserProfile,
    stats: &mut UserStats,
    now: Timestamp,
) -> EngineResult<()> {
    stats.updated_at = now;
    profile.sync_mirrored(stats);
    profile.updated_at = now;
    tx.set(&paths::user(profile.user_id), profile)?;
    tx.set(&paths::user_stats(stats.user_id), stats)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use chrono::TimeZone;
    use squadquest_core::Timestamp;

    /// Fixed reference time: Thursday 2026-08-06 12:00 UTC.
    pub fn t0() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    pub fn engine() -> (RewardEngine, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = RewardEngine::new(
            Arc::new(DocumentStore::new()),
            RewardRules::default(),
            dispatcher.clone(),
        );
        (engine, dispatcher)
    }

    pub async fn seed_user(engine: &RewardEngine, name: &str) -> Uuid {
        let user_id = Uuid::now_v7();
        engine
            .ensure_user(user_id, name, "Berlin", t0())
            .await
            .expect("seed user");
        user_id
    }

    /// Read both user documents for invariant checks.
    pub fn user_pair(engine: &RewardEngine, user_id: Uuid) -> (UserProfile, UserStats) {
        let profile = engine
            .store()
            .get(&paths::user(user_id))
            .unwrap()
            .expect("profile");
        let stats = engine
            .store()
            .get(&paths::user_stats(user_id))
            .unwrap()
            .expect("stats");
        (profile, stats)
    }

    /// Assert every mirrored field agrees between profile and stats.
    pub fn assert_mirrors_consistent(engine: &RewardEngine, user_id: Uuid) {
        let (profile, stats) = user_pair(engine, user_id);
        assert_eq!(profile.xp, stats.xp, "wallet xp mirror");
        assert_eq!(profile.lifetime_xp, stats.lifetime_xp, "lifetime xp mirror");
        assert_eq!(profile.this_week_xp, stats.this_week_xp, "weekly xp mirror");
        assert_eq!(profile.level, stats.level, "level mirror");
        assert_eq!(profile.daily_streak, stats.daily_streak, "streak mirror");
        assert_eq!(profile.badges, stats.badges, "badge mirror");
        assert_eq!(profile.last_claimed_at, stats.last_claimed_at, "claim timestamp mirror");
    }
}
