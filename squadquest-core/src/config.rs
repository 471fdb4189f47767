//! Reward rule configuration.
//!
//! Every tunable constant of the reward engine lives in one explicit
//! [`RewardRules`] value injected into the engine, never in ambient globals.

use crate::Timestamp;
use chrono::{Datelike, Duration, Timelike, Weekday};

/// One tier of the weekly leaderboard payout (rank 1..=3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyTier {
    /// XP bonus granted to the winner.
    pub xp: i64,
    /// Cosmetic border id applied to the winner's profile.
    pub border: String,
    /// Permanent badge id granted to the winner.
    pub badge: String,
}

/// Tunable rule table for the reward engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardRules {
    // ========================================================================
    // Daily bounty
    // ========================================================================
    /// Base XP per bounty claim.
    pub bounty_base_xp: i64,
    /// Flat bonus once the streak exceeds `bounty_streak_bonus_after`.
    pub bounty_streak_bonus_xp: i64,
    /// Streak length that must be exceeded for the bonus to apply.
    pub bounty_streak_bonus_after: i32,
    /// Hours a user must wait between claims.
    pub bounty_cooldown_hours: i64,
    /// Hours after which an unclaimed streak breaks.
    pub streak_break_hours: i64,
    /// Hours the freeze rewinds `last_claimed_at` to, making the bounty
    /// immediately claimable without losing the streak.
    pub freeze_rewind_hours: i64,

    // ========================================================================
    // Quest finalization
    // ========================================================================
    /// Base XP for completing a quest.
    pub quest_base_xp: i64,
    /// Bonus for finalizing within the punctuality window after start.
    pub punctuality_bonus_xp: i64,
    /// Punctuality window length, measured from the quest start time.
    pub punctuality_window_hours: i64,
    /// Bonus for attaching photo evidence.
    pub photo_bonus_xp: i64,
    /// Bonus paid when the finalizer is the quest host.
    pub host_bonus_xp: i64,
    /// Multiplier applied to the whole finalize reward during a Showdown.
    pub showdown_multiplier: i64,
    /// UTC hour (inclusive) at which the Sunday Showdown window opens.
    pub showdown_start_hour: u32,
    /// UTC hour (inclusive) at which the Sunday Showdown window closes.
    pub showdown_end_hour: u32,

    // ========================================================================
    // Leaving a quest
    // ========================================================================
    /// Leaving within this many hours of the start time incurs the penalty.
    pub leave_grace_hours: i64,
    /// Penalty is `lifetime_xp / leave_penalty_divisor` (2% at 50),
    /// floored at 1 XP when the user has any XP at all.
    pub leave_penalty_divisor: i64,

    // ========================================================================
    // Peer review
    // ========================================================================
    /// XP granted to the target per awarded tag.
    pub vibe_tag_xp: i64,
    /// Flat XP granted to the reviewer, once per quest.
    pub vibe_reviewer_xp: i64,
    /// Feedback-counter value at which a tag's badge unlocks.
    pub vibe_badge_threshold: i64,

    // ========================================================================
    // Quests / shop / weekly cycle
    // ========================================================================
    /// Fraction of capacity at which the one-time hot-zone alert fires.
    pub hot_zone_threshold: f64,
    /// Days a voucher redemption stays valid.
    pub redemption_validity_days: i64,
    /// Days the rank-1 weekly XP boost stays active.
    pub boost_duration_days: i64,
    /// Payout tiers for weekly ranks 1..=3.
    pub weekly_tiers: [WeeklyTier; 3],
}

impl Default for RewardRules {
    fn default() -> Self {
        Self {
            bounty_base_xp: 50,
            bounty_streak_bonus_xp: 25,
            bounty_streak_bonus_after: 5,
            bounty_cooldown_hours: 25,
            streak_break_hours: 48,
            freeze_rewind_hours: 25,

            quest_base_xp: 100,
            punctuality_bonus_xp: 25,
            punctuality_window_hours: 2,
            photo_bonus_xp: 20,
            host_bonus_xp: 20,
            showdown_multiplier: 2,
            showdown_start_hour: 18,
            showdown_end_hour: 23,

            leave_grace_hours: 1,
            leave_penalty_divisor: 50,

            vibe_tag_xp: 5,
            vibe_reviewer_xp: 50,
            vibe_badge_threshold: 10,

            hot_zone_threshold: 0.75,
            redemption_validity_days: 30,
            boost_duration_days: 7,
            weekly_tiers: [
                WeeklyTier {
                    xp: 500,
                    border: "border-gold".to_string(),
                    badge: crate::badges::WEEKLY_RANK[0].to_string(),
                },
                WeeklyTier {
                    xp: 300,
                    border: "border-silver".to_string(),
                    badge: crate::badges::WEEKLY_RANK[1].to_string(),
                },
                WeeklyTier {
                    xp: 150,
                    border: "border-bronze".to_string(),
                    badge: crate::badges::WEEKLY_RANK[2].to_string(),
                },
            ],
        }
    }
}

impl RewardRules {
    pub fn bounty_cooldown(&self) -> Duration {
        Duration::hours(self.bounty_cooldown_hours)
    }

    pub fn streak_break(&self) -> Duration {
        Duration::hours(self.streak_break_hours)
    }

    pub fn freeze_rewind(&self) -> Duration {
        Duration::hours(self.freeze_rewind_hours)
    }

    pub fn punctuality_window(&self) -> Duration {
        Duration::hours(self.punctuality_window_hours)
    }

    pub fn leave_grace(&self) -> Duration {
        Duration::hours(self.leave_grace_hours)
    }

    pub fn redemption_validity(&self) -> Duration {
        Duration::days(self.redemption_validity_days)
    }

    pub fn boost_duration(&self) -> Duration {
        Duration::days(self.boost_duration_days)
    }

    /// Daily bounty reward for the given (already updated) streak.
    pub fn bounty_reward(&self, streak: i32) -> i64 {
        if streak > self.bounty_streak_bonus_after {
            self.bounty_base_xp + self.bounty_streak_bonus_xp
        } else {
            self.bounty_base_xp
        }
    }

    /// Leave penalty for a user with the given lifetime XP.
    pub fn leave_penalty(&self, lifetime_xp: i64) -> i64 {
        if lifetime_xp <= 0 {
            0
        } else {
            (lifetime_xp / self.leave_penalty_divisor).max(1)
        }
    }

    /// Whether `at` falls inside the Showdown double-reward window
    /// (Sunday evenings, UTC).
    pub fn is_showdown(&self, at: Timestamp) -> bool {
        at.weekday() == Weekday::Sun
            && at.hour() >= self.showdown_start_hour
            && at.hour() <= self.showdown_end_hour
    }
}

/// Start of the leaderboard week containing `at`: Monday 00:00 UTC.
///
/// Both the global weekly reset job and the lazy per-user fallback compare
/// against this value, which is what keeps the two mechanisms idempotent
/// against each other.
pub fn week_start(at: Timestamp) -> Timestamp {
    let first_day = at.date_naive().week(Weekday::Mon).first_day();
    let midnight = first_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    Timestamp::from_naive_utc_and_offset(midnight, chrono::Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bounty_reward_flat_bonus() {
        let rules = RewardRules::default();
        assert_eq!(rules.bounty_reward(1), 50);
        assert_eq!(rules.bounty_reward(5), 50);
        assert_eq!(rules.bounty_reward(6), 75);
        assert_eq!(rules.bounty_reward(40), 75);
    }

    #[test]
    fn test_leave_penalty_floors_at_one() {
        let rules = RewardRules::default();
        assert_eq!(rules.leave_penalty(0), 0);
        assert_eq!(rules.leave_penalty(10), 1);
        assert_eq!(rules.leave_penalty(49), 1);
        assert_eq!(rules.leave_penalty(5000), 100);
    }

    #[test]
    fn test_showdown_window() {
        let rules = RewardRules::default();
        // 2026-08-02 is a Sunday.
        let inside = chrono::Utc.with_ymd_and_hms(2026, 8, 2, 19, 30, 0).unwrap();
        let before = chrono::Utc.with_ymd_and_hms(2026, 8, 2, 17, 59, 0).unwrap();
        let monday = chrono::Utc.with_ymd_and_hms(2026, 8, 3, 19, 30, 0).unwrap();
        assert!(rules.is_showdown(inside));
        assert!(!rules.is_showdown(before));
        assert!(!rules.is_showdown(monday));
    }

    #[test]
    fn test_week_start_is_monday_midnight() {
        // 2026-08-06 is a Thursday; its week starts Monday 2026-08-03.
        let thursday = chrono::Utc.with_ymd_and_hms(2026, 8, 6, 15, 4, 5).unwrap();
        let start = week_start(thursday);
        assert_eq!(start, chrono::Utc.with_ymd_and_hms(2026, 8, 3, 0, 0, 0).unwrap());
        // A Monday maps to itself at midnight.
        assert_eq!(week_start(start), start);
    }

    #[test]
    fn test_weekly_tiers_are_descending() {
        let rules = RewardRules::default();
        assert!(rules.weekly_tiers[0].xp > rules.weekly_tiers[1].xp);
        assert!(rules.weekly_tiers[1].xp > rules.weekly_tiers[2].xp);
    }
}
