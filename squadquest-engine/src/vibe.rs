//! Peer review ("vibe check").
//!
//! One batched read of every affected document, then all target updates,
//! the reviewer's own update and the activity entries are staged in a single
//! transaction - never N sequential read-modify-write round trips.

use crate::{activity, paths, read_user_pair, stage_user_pair, RewardEngine};
use squadquest_core::{
    ActivityEntry, ActivityKind, EngineError, EngineResult, FeedbackTag, QuestMember, Timestamp,
};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Result of submitting a peer review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibeOutcome {
    /// The reviewer had already submitted for this quest; nothing was
    /// written.
    pub already_submitted: bool,
    /// XP paid to the reviewer.
    pub earned_xp: i64,
    /// Tags applied across all targets.
    pub tags_applied: usize,
}

impl RewardEngine {
    /// Submit a peer review for a quest.
    ///
    /// The reviewer must be a member of the quest and reviews each teammate
    /// with zero or more tags. Every tag grants the target XP and bumps the
    /// per-tag feedback counter; a counter reaching its threshold unlocks
    /// the tag's badge (idempotently) with its own activity entry. The
    /// reviewer is paid a flat reward exactly once per quest.
    pub async fn submit_vibe_check(
        &self,
        reviewer_id: Uuid,
        quest_id: Uuid,
        reviews: &BTreeMap<Uuid, Vec<FeedbackTag>>,
        now: Timestamp,
    ) -> EngineResult<VibeOutcome> {
        if reviews.contains_key(&reviewer_id) {
            return Err(EngineError::precondition("Cannot review yourself"));
        }
        let rules = self.rules();
        self.store().run_transaction(|tx| {
            // ---- Read phase: everything the computation touches. ----
            let _quest: squadquest_core::Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            let mut reviewer_member: QuestMember = tx
                .get(&paths::quest_member(quest_id, reviewer_id))?
                .ok_or_else(|| {
                    EngineError::precondition("Not a verified member of this quest")
                })?;
            let (mut reviewer_profile, mut reviewer_stats) = read_user_pair(tx, reviewer_id)?;

            if reviewer_member.vibe_checked {
                return Ok(VibeOutcome {
                    already_submitted: true,
                    earned_xp: 0,
                    tags_applied: 0,
                });
            }

            let mut targets = Vec::new();
            for (&target_id, tags) in reviews {
                let membership: Option<QuestMember> =
                    tx.get(&paths::quest_member(quest_id, target_id))?;
                if membership.is_none() {
                    return Err(EngineError::precondition(
                        "Reviewed user is not a member of this quest",
                    ));
                }
                let pair = read_user_pair(tx, target_id)?;
                // Duplicate tags in one review collapse to a single award.
                let tags: BTreeSet<FeedbackTag> = tags.iter().copied().collect();
                targets.push((pair, tags));
            }

            // ---- Compute + write phase. ----
            let mut tags_applied = 0;
            let mut entries = Vec::new();
            for ((profile, stats), tags) in &mut targets {
                for tag in tags.iter() {
                    let count = {
                        let c = stats.feedback_counts.entry(*tag).or_insert(0);
                        *c += 1;
                        *c
                    };
                    stats.grant_xp(rules.vibe_tag_xp);
                    tags_applied += 1;

                    if count == rules.vibe_badge_threshold && stats.unlock_badge(tag.badge_id()) {
                        entries.push(ActivityEntry::new(
                            ActivityKind::BadgeUnlocked,
                            profile.user_id,
                            profile.name.clone(),
                            tag.badge_id(),
                            0,
                            now,
                        ));
                    }
                }
                stage_user_pair(tx, profile, stats, now)?;
            }

            reviewer_stats.grant_xp(rules.vibe_reviewer_xp);
            reviewer_member.vibe_checked = true;
            stage_user_pair(tx, &mut reviewer_profile, &mut reviewer_stats, now)?;
            tx.set(&paths::quest_member(quest_id, reviewer_id), &reviewer_member)?;

            entries.push(ActivityEntry::new(
                ActivityKind::VibeCheck,
                reviewer_id,
                reviewer_profile.name.clone(),
                quest_id.to_string(),
                rules.vibe_reviewer_xp,
                now,
            ));
            for entry in &entries {
                activity::record(tx, entry)?;
            }

            Ok(VibeOutcome {
                already_submitted: false,
                earned_xp: rules.vibe_reviewer_xp,
                tags_applied,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_mirrors_consistent, engine, seed_user, t0, user_pair};
    use crate::CreateQuestParams;
    use chrono::Duration;

    async fn quest_with(engine: &RewardEngine, members: usize) -> (Uuid, Uuid, Vec<Uuid>) {
        let host = seed_user(engine, "Host").await;
        let quest = engine
            .create_quest(
                host,
                CreateQuestParams {
                    title: "Night market".to_string(),
                    description: None,
                    city: "Berlin".to_string(),
                    max_players: 8,
                    is_private: false,
                    secret_code: None,
                    start_time: t0() + Duration::hours(6),
                },
                t0(),
            )
            .await
            .unwrap();
        let mut uids = Vec::new();
        for i in 0..members {
            let uid = seed_user(engine, &format!("M{}", i)).await;
            engine.join_quest(uid, quest.quest_id, None, t0()).await.unwrap();
            uids.push(uid);
        }
        (quest.quest_id, host, uids)
    }

    #[tokio::test]
    async fn test_vibe_check_pays_targets_and_reviewer_atomically() {
        let (engine, _) = engine();
        let (quest_id, host, members) = quest_with(&engine, 2).await;

        let mut reviews = BTreeMap::new();
        reviews.insert(members[0], vec![FeedbackTag::Leader, FeedbackTag::Hype]);
        reviews.insert(members[1], vec![FeedbackTag::Reliable]);

        let outcome = engine
            .submit_vibe_check(host, quest_id, &reviews, t0())
            .await
            .unwrap();
        assert!(!outcome.already_submitted);
        assert_eq!(outcome.earned_xp, 50);
        assert_eq!(outcome.tags_applied, 3);

        let (p0, s0) = user_pair(&engine, members[0]);
        assert_eq!(p0.xp, 10, "two tags at 5 XP each");
        assert_eq!(s0.feedback_counts.get(&FeedbackTag::Leader), Some(&1));
        let (p1, _) = user_pair(&engine, members[1]);
        assert_eq!(p1.xp, 5);
        let (ph, _) = user_pair(&engine, host);
        assert_eq!(ph.xp, 50);

        for uid in [host, members[0], members[1]] {
            assert_mirrors_consistent(&engine, uid);
        }
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_softly() {
        let (engine, _) = engine();
        let (quest_id, host, members) = quest_with(&engine, 1).await;
        let mut reviews = BTreeMap::new();
        reviews.insert(members[0], vec![FeedbackTag::Leader]);

        engine.submit_vibe_check(host, quest_id, &reviews, t0()).await.unwrap();
        let replay = engine
            .submit_vibe_check(host, quest_id, &reviews, t0())
            .await
            .unwrap();
        assert!(replay.already_submitted);
        assert_eq!(replay.earned_xp, 0);

        let (p0, _) = user_pair(&engine, members[0]);
        assert_eq!(p0.xp, 5, "no double award to the target");
        let (ph, _) = user_pair(&engine, host);
        assert_eq!(ph.xp, 50, "reviewer reward paid once");
    }

    #[tokio::test]
    async fn test_threshold_unlocks_badge_exactly_once() {
        let (engine, _) = engine();
        let threshold = engine.rules().vibe_badge_threshold;
        let host = seed_user(&engine, "Target").await;

        // Feed reviews from distinct quests until the counter crosses the
        // threshold.
        for round in 0..(threshold + 2) {
            let reviewer = seed_user(&engine, &format!("R{}", round)).await;
            let quest = engine
                .create_quest(
                    reviewer,
                    CreateQuestParams {
                        title: format!("Quest {}", round),
                        description: None,
                        city: "Berlin".to_string(),
                        max_players: 4,
                        is_private: false,
                        secret_code: None,
                        start_time: t0() + Duration::hours(6),
                    },
                    t0(),
                )
                .await
                .unwrap();
            engine.join_quest(host, quest.quest_id, None, t0()).await.unwrap();
            let mut reviews = BTreeMap::new();
            reviews.insert(host, vec![FeedbackTag::Strategist]);
            engine
                .submit_vibe_check(reviewer, quest.quest_id, &reviews, t0())
                .await
                .unwrap();
        }

        let (profile, stats) = user_pair(&engine, host);
        assert_eq!(
            stats.feedback_counts.get(&FeedbackTag::Strategist),
            Some(&(threshold + 2))
        );
        assert!(profile.badges.contains(FeedbackTag::Strategist.badge_id()));

        let unlock_entries = engine
            .recent_activity(100)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| {
                e.kind == ActivityKind::BadgeUnlocked
                    && e.target == FeedbackTag::Strategist.badge_id()
            })
            .count();
        assert_eq!(unlock_entries, 1, "badge unlock logged exactly once");
    }

    #[tokio::test]
    async fn test_reviewer_must_be_member_and_cannot_self_review() {
        let (engine, _) = engine();
        let (quest_id, _, members) = quest_with(&engine, 1).await;

        let outsider = seed_user(&engine, "Outsider").await;
        let mut reviews = BTreeMap::new();
        reviews.insert(members[0], vec![FeedbackTag::Hype]);
        let err = engine
            .submit_vibe_check(outsider, quest_id, &reviews, t0())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::precondition("Not a verified member of this quest")
        );

        let mut self_review = BTreeMap::new();
        self_review.insert(members[0], vec![FeedbackTag::Hype]);
        let err = engine
            .submit_vibe_check(members[0], quest_id, &self_review, t0())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::precondition("Cannot review yourself"));
    }

    #[tokio::test]
    async fn test_non_member_target_is_rejected() {
        let (engine, _) = engine();
        let (quest_id, host, _) = quest_with(&engine, 0).await;
        let stranger = seed_user(&engine, "Stranger").await;
        let mut reviews = BTreeMap::new();
        reviews.insert(stranger, vec![FeedbackTag::Leader]);
        let err = engine
            .submit_vibe_check(host, quest_id, &reviews, t0())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::precondition("Reviewed user is not a member of this quest")
        );
    }
}
