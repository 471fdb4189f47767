//! Daily bounty claims and streak protection.
//!
//! Claim state machine per user: Claimable -> Cooling Down (25h) -> Claimable.
//! The claim timestamp is always server-assigned; the client never supplies
//! it, so clocks cannot be manipulated.

use crate::{activity, notify::Notification, read_user_pair, stage_user_pair, RewardEngine};
use squadquest_core::{ActivityEntry, ActivityKind, EngineError, EngineResult, Timestamp, UserProfile};
use squadquest_store::collections;
use uuid::Uuid;

/// Result of a successful bounty claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyOutcome {
    pub earned_xp: i64,
    pub streak: i32,
    pub new_level: i32,
}

/// Result of the opportunistic streak-protection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakSyncOutcome {
    /// A streak freeze was consumed to keep the streak alive.
    pub froze: bool,
    /// The streak lapsed with no freeze available and was reset to 0.
    pub streak_reset: bool,
    pub freezes_left: i64,
}

impl RewardEngine {
    /// Claim the daily bounty.
    ///
    /// Rejects with [`EngineError::CooldownActive`] inside the cooldown
    /// window. A gap longer than the streak-break window restarts the streak
    /// at 1; otherwise it increments.
    pub async fn claim_daily_bounty(
        &self,
        user_id: Uuid,
        now: Timestamp,
    ) -> EngineResult<BountyOutcome> {
        let rules = self.rules();
        let outcome = self.store().run_transaction(|tx| {
            let (mut profile, mut stats) = read_user_pair(tx, user_id)?;

            if let Some(last) = stats.last_claimed_at {
                let elapsed = now - last;
                if elapsed < rules.bounty_cooldown() {
                    let retry_in = rules.bounty_cooldown() - elapsed;
                    return Err(EngineError::CooldownActive {
                        retry_in_secs: retry_in.num_seconds().max(1),
                    });
                }
            }

            let streak = match stats.last_claimed_at {
                Some(last) if now - last <= rules.streak_break() => stats.daily_streak + 1,
                _ => 1,
            };
            let earned = rules.bounty_reward(streak);

            stats.daily_streak = streak;
            stats.last_claimed_at = Some(now);
            stats.grant_xp(earned);

            let entry = ActivityEntry::new(
                ActivityKind::BountyClaimed,
                user_id,
                profile.name.clone(),
                "daily-bounty",
                earned,
                now,
            );
            stage_user_pair(tx, &mut profile, &mut stats, now)?;
            activity::record(tx, &entry)?;

            Ok(BountyOutcome {
                earned_xp: earned,
                streak,
                new_level: stats.level,
            })
        })?;

        tracing::info!(
            user_id = %user_id,
            earned_xp = outcome.earned_xp,
            streak = outcome.streak,
            "bounty claimed"
        );
        Ok(outcome)
    }

    /// Streak protection, run opportunistically on profile load.
    ///
    /// When the streak-break window has elapsed: consume one streak freeze
    /// (rewinding `last_claimed_at` so the bounty is immediately claimable
    /// without losing the streak), or reset the streak to 0 if none is held.
    /// Shares the claim's transactional fields, so a claim racing a sync is
    /// serialized by the store.
    pub async fn sync_streak(
        &self,
        user_id: Uuid,
        now: Timestamp,
    ) -> EngineResult<StreakSyncOutcome> {
        let rules = self.rules();
        self.store().run_transaction(|tx| {
            let (mut profile, mut stats) = read_user_pair(tx, user_id)?;
            let freezes = stats.consumable_count(squadquest_core::items::STREAK_FREEZE);

            let lapsed = match stats.last_claimed_at {
                Some(last) => now - last > rules.streak_break(),
                None => false,
            };
            if !lapsed || stats.daily_streak == 0 {
                return Ok(StreakSyncOutcome {
                    froze: false,
                    streak_reset: false,
                    freezes_left: freezes,
                });
            }

            let outcome = if freezes > 0 {
                stats
                    .inventory
                    .insert(squadquest_core::items::STREAK_FREEZE.to_string(), freezes - 1);
                stats.last_claimed_at = Some(now - rules.freeze_rewind());
                StreakSyncOutcome {
                    froze: true,
                    streak_reset: false,
                    freezes_left: freezes - 1,
                }
            } else {
                stats.daily_streak = 0;
                StreakSyncOutcome {
                    froze: false,
                    streak_reset: true,
                    freezes_left: 0,
                }
            };

            stage_user_pair(tx, &mut profile, &mut stats, now)?;
            Ok(outcome)
        })
    }

    /// Remind users whose bounty became claimable within the last hour.
    ///
    /// Called by the hourly reminder job; the one-hour window means each
    /// user is picked up by exactly one tick instead of being nagged every
    /// hour until they claim. Returns the number of reminders dispatched.
    pub async fn send_bounty_reminders(&self, now: Timestamp) -> EngineResult<usize> {
        let cooldown = self.rules().bounty_cooldown();
        let profiles: Vec<UserProfile> = self.store().scan(collections::USERS)?;

        let mut notifications = Vec::new();
        for profile in profiles {
            let Some(last) = profile.last_claimed_at else {
                continue;
            };
            let since = now - last;
            if since >= cooldown && since < cooldown + chrono::Duration::hours(1) {
                notifications.push(Notification::new(
                    profile.user_id,
                    "Daily bounty ready",
                    "Your daily bounty is waiting. Claim it to keep the streak alive!",
                ));
            }
        }

        let count = notifications.len();
        self.dispatch_all(notifications).await;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{assert_mirrors_consistent, engine, seed_user, t0, user_pair};
    use chrono::Duration;
    use squadquest_core::{items, EngineError};

    #[tokio::test]
    async fn test_first_claim_pays_base_and_starts_streak() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;

        let outcome = engine.claim_daily_bounty(uid, t0()).await.unwrap();
        assert_eq!(outcome.earned_xp, 50);
        assert_eq!(outcome.streak, 1);
        assert_eq!(outcome.new_level, 1);

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.xp, 50);
        assert_eq!(profile.daily_streak, 1);
        assert_eq!(profile.last_claimed_at, Some(t0()));
        assert_mirrors_consistent(&engine, uid);
    }

    #[tokio::test]
    async fn test_claim_inside_cooldown_is_rejected_without_state_change() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        let before = user_pair(&engine, uid);
        let err = engine
            .claim_daily_bounty(uid, t0() + Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CooldownActive { .. }));
        assert_eq!(user_pair(&engine, uid), before, "no partial effects");
    }

    #[tokio::test]
    async fn test_claim_at_hour_26_increments_streak() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        let outcome = engine
            .claim_daily_bounty(uid, t0() + Duration::hours(26))
            .await
            .unwrap();
        assert_eq!(outcome.earned_xp, 50);
        assert_eq!(outcome.streak, 2);

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.xp, 100);
    }

    #[tokio::test]
    async fn test_claim_after_streak_break_restarts_at_one() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        let outcome = engine
            .claim_daily_bounty(uid, t0() + Duration::hours(72))
            .await
            .unwrap();
        assert_eq!(outcome.streak, 1);
    }

    #[tokio::test]
    async fn test_streak_bonus_applies_past_threshold() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        let mut at = t0();
        for day in 1..=6 {
            let outcome = engine.claim_daily_bounty(uid, at).await.unwrap();
            assert_eq!(outcome.streak, day);
            let expected = if day > 5 { 75 } else { 50 };
            assert_eq!(outcome.earned_xp, expected);
            at += Duration::hours(26);
        }
    }

    #[tokio::test]
    async fn test_sync_streak_consumes_freeze_and_rewinds_claimability() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        // Hand the user one freeze.
        let now = t0() + Duration::hours(60);
        engine
            .store()
            .run_transaction(|tx| {
                let (mut profile, mut stats) = crate::read_user_pair(tx, uid)?;
                stats.inventory.insert(items::STREAK_FREEZE.to_string(), 1);
                crate::stage_user_pair(tx, &mut profile, &mut stats, now)
            })
            .unwrap();

        let outcome = engine.sync_streak(uid, now).await.unwrap();
        assert!(outcome.froze);
        assert_eq!(outcome.freezes_left, 0);

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.daily_streak, 1, "streak survives");
        assert_eq!(profile.last_claimed_at, Some(now - Duration::hours(25)));

        // The rewind makes the bounty immediately claimable, streak intact.
        let claim = engine.claim_daily_bounty(uid, now).await.unwrap();
        assert_eq!(claim.streak, 2);
    }

    #[tokio::test]
    async fn test_sync_streak_without_freeze_resets_to_zero() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        let outcome = engine
            .sync_streak(uid, t0() + Duration::hours(60))
            .await
            .unwrap();
        assert!(outcome.streak_reset);

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.daily_streak, 0);
        assert_mirrors_consistent(&engine, uid);
    }

    #[tokio::test]
    async fn test_reminders_fire_only_in_the_claimable_hour() {
        let (engine, dispatcher) = engine();
        let uid = seed_user(&engine, "Ada").await;
        // A user who never claimed is never reminded.
        seed_user(&engine, "Bo").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        // Still cooling down: nothing to remind.
        let count = engine
            .send_bounty_reminders(t0() + Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Became claimable half an hour ago: exactly one reminder.
        let count = engine
            .send_bounty_reminders(t0() + Duration::hours(25) + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(count, 1);
        let sent = dispatcher.take();
        assert_eq!(sent[0].user_id, uid);

        // The next hourly tick no longer matches the window.
        let count = engine
            .send_bounty_reminders(t0() + Duration::hours(27))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_sync_streak_within_window_is_a_no_op() {
        let (engine, _) = engine();
        let uid = seed_user(&engine, "Ada").await;
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        let outcome = engine
            .sync_streak(uid, t0() + Duration::hours(30))
            .await
            .unwrap();
        assert!(!outcome.froze);
        assert!(!outcome.streak_reset);
        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.daily_streak, 1);
    }
}
