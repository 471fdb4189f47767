//! Quest lifecycle: create, join, finalize, leave, edit, delete.

use crate::{activity, notify::Notification, paths, read_user_pair, stage_user_pair, RewardEngine};
use squadquest_core::{
    badges, ActivityEntry, ActivityKind, EngineError, EngineResult, MemberRole, Quest, QuestMember,
    QuestStatus, Timestamp, Verification,
};
use squadquest_store::collections;
use uuid::Uuid;

/// Fields a host may never change through the edit surface.
const PROTECTED_FIELDS: [&str; 7] = [
    "quest_id",
    "id",
    "host_id",
    "members",
    "members_count",
    "completed_by",
    "created_at",
];

/// Parameters for creating a quest.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateQuestParams {
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    pub max_players: i32,
    pub is_private: bool,
    pub secret_code: Option<String>,
    pub start_time: Timestamp,
}

/// Result of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The caller was already a member; nothing was written.
    pub already_member: bool,
    pub members_count: i32,
    /// This join crossed the hot-zone threshold and alerted the host.
    pub hot_zone_alerted: bool,
}

/// Result of finalizing a quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    /// The verification was already rewarded; nothing was written.
    pub already_claimed: bool,
    pub earned_xp: i64,
    pub new_level: i32,
    pub bonuses: Vec<String>,
    pub new_badges: Vec<String>,
}

/// Result of leaving a quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// XP deducted from the lifetime and weekly totals (0 outside the
    /// grace window).
    pub penalty_xp: i64,
}

impl RewardEngine {
    /// Create a quest; the creator becomes host and first member.
    pub async fn create_quest(
        &self,
        host_id: Uuid,
        params: CreateQuestParams,
        now: Timestamp,
    ) -> EngineResult<Quest> {
        if params.title.trim().is_empty() {
            return Err(EngineError::precondition("Title must not be empty"));
        }
        if params.max_players < 1 {
            return Err(EngineError::precondition("maxPlayers must be at least 1"));
        }
        if params.is_private && params.secret_code.as_deref().unwrap_or("").trim().is_empty() {
            return Err(EngineError::precondition(
                "Private quests require a secret code",
            ));
        }

        let quest_id = squadquest_core::new_entity_id();
        self.store().run_transaction(|tx| {
            // The host must exist; the read also serializes concurrent
            // operations on the same user.
            let _ = read_user_pair(tx, host_id)?;

            let mut quest = Quest::new(
                quest_id,
                host_id,
                params.title.clone(),
                params.city.clone(),
                params.max_players,
                params.start_time,
                now,
            );
            quest.description = params.description.clone();
            quest.is_private = params.is_private;
            quest.secret_code = params.secret_code.clone();
            quest.members_count = 1;

            let member = QuestMember::new(quest_id, host_id, MemberRole::Host, now);
            tx.set(&paths::quest(quest_id), &quest)?;
            tx.set(&paths::quest_member(quest_id, host_id), &member)?;
            Ok(quest)
        })
    }

    /// Join a quest.
    ///
    /// The capacity check and the member-count increment happen inside one
    /// transaction, so two concurrent joins can never both take the last
    /// slot. Re-joining is an idempotent no-op. After commit the host gets a
    /// "new member" notification, plus a one-time hot-zone alert when
    /// membership crosses the capacity threshold.
    pub async fn join_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        secret_code: Option<&str>,
        now: Timestamp,
    ) -> EngineResult<JoinOutcome> {
        let rules = self.rules();
        let (outcome, notifications) = self.store().run_transaction(|tx| {
            let mut quest: Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            let (profile, _) = read_user_pair(tx, user_id)?;
            let existing: Option<QuestMember> = tx.get(&paths::quest_member(quest_id, user_id))?;

            if existing.is_some() {
                return Ok((
                    JoinOutcome {
                        already_member: true,
                        members_count: quest.members_count,
                        hot_zone_alerted: false,
                    },
                    Vec::new(),
                ));
            }
            if quest.status != QuestStatus::Open {
                return Err(EngineError::precondition("Quest is not open"));
            }
            if quest.is_full() {
                return Err(EngineError::precondition("Quest is full"));
            }
            if quest.is_private && user_id != quest.host_id {
                let supplied = secret_code.unwrap_or("");
                if quest.secret_code.as_deref() != Some(supplied) {
                    return Err(EngineError::precondition("Invalid secret code"));
                }
            }

            quest.members_count += 1;
            quest.updated_at = now;

            let mut notifications = vec![Notification::new(
                quest.host_id,
                "New squad member",
                format!("{} joined \"{}\"", profile.name, quest.title),
            )];
            let mut hot_zone_alerted = false;
            if !quest.hot_zone_notified && quest.hot_zone_reached(rules.hot_zone_threshold) {
                quest.hot_zone_notified = true;
                hot_zone_alerted = true;
                notifications.push(Notification::new(
                    quest.host_id,
                    "Hot zone",
                    format!("\"{}\" is almost full", quest.title),
                ));
            }

            let member = QuestMember::new(quest_id, user_id, MemberRole::Member, now);
            tx.set(&paths::quest(quest_id), &quest)?;
            tx.set(&paths::quest_member(quest_id, user_id), &member)?;

            Ok((
                JoinOutcome {
                    already_member: false,
                    members_count: quest.members_count,
                    hot_zone_alerted,
                },
                notifications,
            ))
        })?;

        self.dispatch_all(notifications).await;
        Ok(outcome)
    }

    /// Finalize a quest for the calling member and pay the completion reward.
    ///
    /// Idempotent through the verification record's `rewarded` flag: the
    /// flag is set in the same transaction that pays out, and a replay
    /// short-circuits into an `already_claimed` outcome with zero writes.
    pub async fn finalize_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        photo_url: Option<&str>,
        now: Timestamp,
    ) -> EngineResult<FinalizeOutcome> {
        let rules = self.rules();
        let outcome = self.store().run_transaction(|tx| {
            let quest: Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            let (mut profile, mut stats) = read_user_pair(tx, user_id)?;
            let member: Option<QuestMember> = tx.get(&paths::quest_member(quest_id, user_id))?;
            if member.is_none() {
                return Err(EngineError::precondition("Not a member of this quest"));
            }
            let verification: Option<Verification> =
                tx.get(&paths::verification(quest_id, user_id))?;
            if verification.as_ref().is_some_and(|v| v.rewarded) {
                return Ok(FinalizeOutcome {
                    already_claimed: true,
                    earned_xp: 0,
                    new_level: stats.level,
                    bonuses: Vec::new(),
                    new_badges: Vec::new(),
                });
            }

            let mut earned = rules.quest_base_xp;
            let mut bonuses = Vec::new();

            let punctual = now <= quest.start_time + rules.punctuality_window();
            if punctual {
                earned += rules.punctuality_bonus_xp;
                bonuses.push("punctuality".to_string());
            }
            let has_photo = photo_url.is_some_and(|url| !url.trim().is_empty());
            if has_photo {
                earned += rules.photo_bonus_xp;
                bonuses.push("photo".to_string());
            }
            let is_host = user_id == quest.host_id;
            if is_host {
                earned += rules.host_bonus_xp;
                bonuses.push("host".to_string());
            }
            let showdown = rules.is_showdown(now);
            if showdown {
                earned *= rules.showdown_multiplier;
                bonuses.push("showdown".to_string());
            }

            let mut new_badges = Vec::new();
            let mut unlock = |stats: &mut squadquest_core::UserStats, badge: &str| {
                if stats.unlock_badge(badge) {
                    new_badges.push(badge.to_string());
                }
            };
            if profile.quests_completed == 0 {
                unlock(&mut stats, badges::FIRST_MISSION);
            }
            if punctual {
                unlock(&mut stats, badges::EARLY_BIRD);
            }
            if has_photo {
                unlock(&mut stats, badges::SHUTTERBUG);
            }
            if showdown {
                unlock(&mut stats, badges::SHOWDOWN_VICTOR);
            }

            stats.grant_xp(earned);
            profile.quests_completed += 1;

            let record = Verification {
                quest_id,
                user_id,
                completed: true,
                rewarded: true,
                earned_xp: earned,
                completed_at: Some(now),
            };

            stage_user_pair(tx, &mut profile, &mut stats, now)?;
            tx.set(&paths::verification(quest_id, user_id), &record)?;
            activity::record(
                tx,
                &ActivityEntry::new(
                    ActivityKind::QuestCompleted,
                    user_id,
                    profile.name.clone(),
                    quest.title.clone(),
                    earned,
                    now,
                ),
            )?;
            for badge in &new_badges {
                activity::record(
                    tx,
                    &ActivityEntry::new(
                        ActivityKind::BadgeUnlocked,
                        user_id,
                        profile.name.clone(),
                        badge.clone(),
                        0,
                        now,
                    ),
                )?;
            }

            Ok(FinalizeOutcome {
                already_claimed: false,
                earned_xp: earned,
                new_level: stats.level,
                bonuses,
                new_badges,
            })
        })?;

        if !outcome.already_claimed {
            tracing::info!(
                user_id = %user_id,
                quest_id = %quest_id,
                earned_xp = outcome.earned_xp,
                "quest finalized"
            );
        }
        Ok(outcome)
    }

    /// Leave a quest. Hosts cannot leave; leaving inside the grace window
    /// (or after the start) deducts a reliability penalty from the lifetime
    /// and weekly totals. Membership removal, counter decrement and penalty
    /// are one atomic write set.
    pub async fn leave_quest(
        &self,
        user_id: Uuid,
        quest_id: Uuid,
        now: Timestamp,
    ) -> EngineResult<LeaveOutcome> {
        let rules = self.rules();
        self.store().run_transaction(|tx| {
            let mut quest: Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            let (mut profile, mut stats) = read_user_pair(tx, user_id)?;
            let member: Option<QuestMember> = tx.get(&paths::quest_member(quest_id, user_id))?;
            if member.is_none() {
                return Err(EngineError::precondition("Not a member of this quest"));
            }
            if user_id == quest.host_id {
                return Err(EngineError::forbidden("Host cannot leave their own quest"));
            }

            let in_grace = now >= quest.start_time - rules.leave_grace();
            let penalty = if in_grace {
                rules.leave_penalty(stats.lifetime_xp)
            } else {
                0
            };

            quest.members_count = (quest.members_count - 1).max(0);
            quest.updated_at = now;
            tx.set(&paths::quest(quest_id), &quest)?;
            tx.delete(&paths::quest_member(quest_id, user_id));

            if penalty > 0 {
                stats.apply_penalty(penalty);
                stage_user_pair(tx, &mut profile, &mut stats, now)?;
                activity::record(
                    tx,
                    &ActivityEntry::new(
                        ActivityKind::QuestLeft,
                        user_id,
                        profile.name.clone(),
                        quest.title.clone(),
                        -penalty,
                        now,
                    ),
                )?;
            }

            Ok(LeaveOutcome { penalty_xp: penalty })
        })
    }

    /// Host-only quest edit. A fixed set of protected fields is rejected;
    /// everything else is merged into the document through serde, so type
    /// mismatches fail validation rather than corrupting the record.
    pub async fn edit_quest(
        &self,
        host_id: Uuid,
        quest_id: Uuid,
        patch: serde_json::Map<String, serde_json::Value>,
        now: Timestamp,
    ) -> EngineResult<Quest> {
        for field in PROTECTED_FIELDS {
            if patch.contains_key(field) {
                return Err(EngineError::precondition(format!(
                    "Field '{}' cannot be edited",
                    field
                )));
            }
        }

        self.store().run_transaction(|tx| {
            let quest: Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            if quest.host_id != host_id {
                return Err(EngineError::forbidden("Only the host can edit a quest"));
            }

            let mut doc = serde_json::to_value(&quest)
                .map_err(|e| EngineError::internal(e.to_string()))?;
            let target = doc
                .as_object_mut()
                .expect("quests serialize as objects");
            for (key, value) in &patch {
                if !target.contains_key(key) {
                    return Err(EngineError::precondition(format!("Unknown field '{}'", key)));
                }
                target.insert(key.clone(), value.clone());
            }
            let mut updated: Quest = serde_json::from_value(doc)
                .map_err(|e| EngineError::precondition(format!("Invalid edit: {}", e)))?;

            if updated.max_players < quest.members_count {
                return Err(EngineError::precondition(
                    "Cannot reduce capacity below the current member count",
                ));
            }
            updated.updated_at = now;
            tx.set(&paths::quest(quest_id), &updated)?;
            Ok(updated)
        })
    }

    /// Host-only quest deletion, cascading to memberships and verifications.
    /// Returns the number of documents removed.
    pub async fn delete_quest(&self, host_id: Uuid, quest_id: Uuid) -> EngineResult<usize> {
        self.store().run_transaction(|tx| {
            let quest: Quest = tx
                .get(&paths::quest(quest_id))?
                .ok_or_else(|| EngineError::not_found("Quest", quest_id))?;
            if quest.host_id != host_id {
                return Err(EngineError::forbidden("Only the host can delete a quest"));
            }

            let members: Vec<QuestMember> = tx.scan(collections::QUEST_MEMBERS)?;
            let verifications: Vec<Verification> = tx.scan(collections::VERIFICATIONS)?;

            let mut removed = 1;
            tx.delete(&paths::quest(quest_id));
            for member in members.iter().filter(|m| m.quest_id == quest_id) {
                tx.delete(&paths::quest_member(quest_id, member.user_id));
                removed += 1;
            }
            for v in verifications.iter().filter(|v| v.quest_id == quest_id) {
                tx.delete(&paths::verification(quest_id, v.user_id));
                removed += 1;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_mirrors_consistent, engine, seed_user, t0, user_pair};
    use chrono::Duration;
    use std::sync::Arc;

    fn params(max_players: i32, start: Timestamp) -> CreateQuestParams {
        CreateQuestParams {
            title: "Ramen run".to_string(),
            description: None,
            city: "Berlin".to_string(),
            max_players,
            is_private: false,
            secret_code: None,
            start_time: start,
        }
    }

    async fn quest_with_members(
        engine: &RewardEngine,
        member_count: usize,
        max_players: i32,
    ) -> (Uuid, Uuid, Vec<Uuid>) {
        let host = seed_user(engine, "Host").await;
        let quest = engine
            .create_quest(host, params(max_players, t0() + Duration::hours(6)), t0())
            .await
            .unwrap();
        let mut members = Vec::new();
        for i in 0..member_count {
            let uid = seed_user(engine, &format!("Member{}", i)).await;
            engine.join_quest(uid, quest.quest_id, None, t0()).await.unwrap();
            members.push(uid);
        }
        (quest.quest_id, host, members)
    }

    #[tokio::test]
    async fn test_create_quest_seeds_host_membership() {
        let (engine, _) = engine();
        let host = seed_user(&engine, "Host").await;
        let quest = engine
            .create_quest(host, params(4, t0() + Duration::hours(6)), t0())
            .await
            .unwrap();
        assert_eq!(quest.members_count, 1);

        let member: Option<QuestMember> = engine
            .store()
            .get(&paths::quest_member(quest.quest_id, host))
            .unwrap();
        assert_eq!(member.unwrap().role, MemberRole::Host);
    }

    #[tokio::test]
    async fn test_private_quest_requires_matching_code() {
        let (engine, _) = engine();
        let host = seed_user(&engine, "Host").await;
        let mut p = params(4, t0() + Duration::hours(6));
        p.is_private = true;
        p.secret_code = Some("otters".to_string());
        let quest = engine.create_quest(host, p, t0()).await.unwrap();

        let uid = seed_user(&engine, "Guest").await;
        let err = engine
            .join_quest(uid, quest.quest_id, Some("wrong"), t0())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::precondition("Invalid secret code"));

        let outcome = engine
            .join_quest(uid, quest.quest_id, Some("otters"), t0())
            .await
            .unwrap();
        assert_eq!(outcome.members_count, 2);
    }

    #[tokio::test]
    async fn test_rejoin_is_idempotent() {
        let (engine, dispatcher) = engine();
        let (quest_id, _, members) = quest_with_members(&engine, 1, 4).await;
        dispatcher.take();

        let outcome = engine.join_quest(members[0], quest_id, None, t0()).await.unwrap();
        assert!(outcome.already_member);
        assert_eq!(outcome.members_count, 2);
        assert_eq!(dispatcher.count(), 0, "no duplicate notifications");
    }

    #[tokio::test]
    async fn test_hot_zone_fires_exactly_once() {
        let (engine, dispatcher) = engine();
        let (quest_id, host, _) = quest_with_members(&engine, 2, 4).await;
        dispatcher.take();

        // 4th member crosses 75%: 4/4 >= 0.75.
        let uid = seed_user(&engine, "Fourth").await;
        let outcome = engine.join_quest(uid, quest_id, None, t0()).await.unwrap();
        assert!(outcome.hot_zone_alerted);
        assert_eq!(outcome.members_count, 4);

        let sent = dispatcher.take();
        let hot_zone: Vec<_> = sent.iter().filter(|n| n.title == "Hot zone").collect();
        assert_eq!(hot_zone.len(), 1);
        assert_eq!(hot_zone[0].user_id, host);

        // A 5th join attempt fails on capacity, not on the code path that
        // would re-alert.
        let fifth = seed_user(&engine, "Fifth").await;
        let err = engine.join_quest(fifth, quest_id, None, t0()).await.unwrap_err();
        assert_eq!(err, EngineError::precondition("Quest is full"));
        assert_eq!(dispatcher.count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_joins_never_overbook() {
        let (engine, _) = engine();
        let host = seed_user(&engine, "Host").await;
        // maxPlayers 2 with the host already in: one slot left.
        let quest = engine
            .create_quest(host, params(2, t0() + Duration::hours(6)), t0())
            .await
            .unwrap();
        let a = seed_user(&engine, "A").await;
        let b = seed_user(&engine, "B").await;

        let engine = Arc::new(engine);
        let (ea, eb) = (engine.clone(), engine.clone());
        let qid = quest.quest_id;
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { ea.join_quest(a, qid, None, t0()).await }),
            tokio::spawn(async move { eb.join_quest(b, qid, None, t0()).await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one join wins the last slot");
        let failure = results.iter().find(|r| r.is_err()).unwrap();
        assert_eq!(
            failure.as_ref().unwrap_err(),
            &EngineError::precondition("Quest is full")
        );

        let stored: Quest = engine.store().get(&paths::quest(qid)).unwrap().unwrap();
        assert_eq!(stored.members_count, 2);
    }

    #[tokio::test]
    async fn test_finalize_pays_once_and_replays_as_already_claimed() {
        let (engine, _) = engine();
        let (quest_id, _, members) = quest_with_members(&engine, 1, 4).await;
        let uid = members[0];
        // Quest starts at t0+6h; finalizing at t0+9h is past the
        // punctuality window, so only the base reward applies.
        let at = t0() + Duration::hours(9);

        let first = engine.finalize_quest(uid, quest_id, None, at).await.unwrap();
        assert!(!first.already_claimed);
        assert_eq!(first.earned_xp, 100);
        assert!(first.new_badges.contains(&badges::FIRST_MISSION.to_string()));

        let replay = engine.finalize_quest(uid, quest_id, None, at).await.unwrap();
        assert!(replay.already_claimed);
        assert_eq!(replay.earned_xp, 0);

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.xp, 100, "exactly one payout");
        assert_eq!(profile.quests_completed, 1);
        // The verification still shows the first payout.
        let v: Verification = engine
            .store()
            .get(&paths::verification(quest_id, uid))
            .unwrap()
            .unwrap();
        assert_eq!(v.earned_xp, 100);
        assert_mirrors_consistent(&engine, uid);
    }

    #[tokio::test]
    async fn test_finalize_bonuses_stack_before_showdown_doubles() {
        let (engine, _) = engine();
        let host = seed_user(&engine, "Host").await;
        // Start the quest on a Sunday evening (2026-08-09 is a Sunday) so a
        // punctual finalize lands inside the Showdown window.
        let start = chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 8, 9, 18, 0, 0).unwrap();
        let quest = engine
            .create_quest(host, params(4, start), t0())
            .await
            .unwrap();

        let at = start + Duration::hours(1);
        let outcome = engine
            .finalize_quest(host, quest.quest_id, Some("https://img/1.jpg"), at)
            .await
            .unwrap();
        // (100 base + 25 punctual + 20 photo + 20 host) * 2 showdown.
        assert_eq!(outcome.earned_xp, 330);
        for bonus in ["punctuality", "photo", "host", "showdown"] {
            assert!(outcome.bonuses.contains(&bonus.to_string()), "{}", bonus);
        }
        for badge in [
            badges::FIRST_MISSION,
            badges::EARLY_BIRD,
            badges::SHUTTERBUG,
            badges::SHOWDOWN_VICTOR,
        ] {
            assert!(outcome.new_badges.contains(&badge.to_string()), "{}", badge);
        }
    }

    #[tokio::test]
    async fn test_finalize_requires_membership() {
        let (engine, _) = engine();
        let (quest_id, _, _) = quest_with_members(&engine, 1, 4).await;
        let outsider = seed_user(&engine, "Outsider").await;
        let err = engine
            .finalize_quest(outsider, quest_id, None, t0())
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::precondition("Not a member of this quest"));
    }

    #[tokio::test]
    async fn test_leave_early_has_no_penalty() {
        let (engine, _) = engine();
        let (quest_id, _, members) = quest_with_members(&engine, 1, 4).await;
        let uid = members[0];
        engine.claim_daily_bounty(uid, t0()).await.unwrap();

        // Quest starts at t0+6h; leaving now is well before the grace window.
        let outcome = engine.leave_quest(uid, quest_id, t0()).await.unwrap();
        assert_eq!(outcome.penalty_xp, 0);

        let quest: Quest = engine.store().get(&paths::quest(quest_id)).unwrap().unwrap();
        assert_eq!(quest.members_count, 1);
        let member: Option<QuestMember> = engine
            .store()
            .get(&paths::quest_member(quest_id, uid))
            .unwrap();
        assert!(member.is_none());
    }

    #[tokio::test]
    async fn test_leave_inside_grace_window_applies_penalty() {
        let (engine, _) = engine();
        let (quest_id, _, members) = quest_with_members(&engine, 1, 4).await;
        let uid = members[0];
        engine.claim_daily_bounty(uid, t0()).await.unwrap(); // lifetime 50

        let outcome = engine
            .leave_quest(uid, quest_id, t0() + Duration::hours(5) + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(outcome.penalty_xp, 1, "2% of 50, floored at 1");

        let (profile, _) = user_pair(&engine, uid);
        assert_eq!(profile.lifetime_xp, 49);
        assert_eq!(profile.this_week_xp, 49);
        assert_eq!(profile.xp, 50, "wallet is untouched by the penalty");
        assert_mirrors_consistent(&engine, uid);
    }

    #[tokio::test]
    async fn test_host_cannot_leave() {
        let (engine, _) = engine();
        let (quest_id, host, _) = quest_with_members(&engine, 1, 4).await;
        let err = engine.leave_quest(host, quest_id, t0()).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_edit_rejects_protected_fields() {
        let (engine, _) = engine();
        let (quest_id, host, _) = quest_with_members(&engine, 0, 4).await;
        let mut patch = serde_json::Map::new();
        patch.insert("host_id".to_string(), serde_json::json!(Uuid::now_v7()));
        let err = engine.edit_quest(host, quest_id, patch, t0()).await.unwrap_err();
        assert_eq!(err, EngineError::precondition("Field 'host_id' cannot be edited"));
    }

    #[tokio::test]
    async fn test_edit_applies_allowed_fields() {
        let (engine, _) = engine();
        let (quest_id, host, _) = quest_with_members(&engine, 0, 4).await;
        let mut patch = serde_json::Map::new();
        patch.insert("title".to_string(), serde_json::json!("Midnight ramen"));
        patch.insert("max_players".to_string(), serde_json::json!(8));
        let quest = engine.edit_quest(host, quest_id, patch, t0()).await.unwrap();
        assert_eq!(quest.title, "Midnight ramen");
        assert_eq!(quest.max_players, 8);
    }

    #[tokio::test]
    async fn test_edit_rejects_non_host_and_capacity_shrink() {
        let (engine, _) = engine();
        let (quest_id, _, members) = quest_with_members(&engine, 2, 4).await;

        let mut patch = serde_json::Map::new();
        patch.insert("title".to_string(), serde_json::json!("hijack"));
        let err = engine
            .edit_quest(members[0], quest_id, patch, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let host_patch = {
            let mut p = serde_json::Map::new();
            // 3 members are in (host + 2); shrinking below that must fail.
            p.insert("max_players".to_string(), serde_json::json!(2));
            p
        };
        let host = {
            let quest: Quest = engine.store().get(&paths::quest(quest_id)).unwrap().unwrap();
            quest.host_id
        };
        let err = engine.edit_quest(host, quest_id, host_patch, t0()).await.unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_subrecords() {
        let (engine, _) = engine();
        let (quest_id, host, members) = quest_with_members(&engine, 2, 4).await;
        engine
            .finalize_quest(members[0], quest_id, None, t0())
            .await
            .unwrap();

        // quest + 3 members + 1 verification
        let removed = engine.delete_quest(host, quest_id).await.unwrap();
        assert_eq!(removed, 5);

        let quest: Option<Quest> = engine.store().get(&paths::quest(quest_id)).unwrap();
        assert!(quest.is_none());
        let member: Option<QuestMember> = engine
            .store()
            .get(&paths::quest_member(quest_id, members[0]))
            .unwrap();
        assert!(member.is_none());
        let v: Option<Verification> = engine
            .store()
            .get(&paths::verification(quest_id, members[0]))
            .unwrap();
        assert!(v.is_none());
    }
}
