//! User provisioning and profile reads.

use crate::{paths, read_user_pair, RewardEngine};
use squadquest_core::{EngineError, EngineResult, Timestamp, UserProfile, UserStats};
use uuid::Uuid;

impl RewardEngine {
    /// Create the user's document pair if it does not exist yet.
    ///
    /// Identity comes from the external auth layer; this runs on first
    /// authenticated contact. Re-running is a cheap no-op apart from
    /// refreshing the display name. Returns true when the user was created.
    pub async fn ensure_user(
        &self,
        user_id: Uuid,
        name: &str,
        city: &str,
        now: Timestamp,
    ) -> EngineResult<bool> {
        self.store.run_transaction(|tx| {
            let existing: Option<UserProfile> = tx.get(&paths::user(user_id))?;
            match existing {
                Some(mut profile) => {
                    if profile.name != name || profile.city != city {
                        profile.name = name.to_string();
                        profile.city = city.to_string();
                        profile.updated_at = now;
                        tx.set(&paths::user(user_id), &profile)?;
                    }
                    Ok(false)
                }
                None => {
                    let profile = UserProfile::new(user_id, name, city, now);
                    let stats = UserStats::new(user_id, now);
                    tx.set(&paths::user(user_id), &profile)?;
                    tx.set(&paths::user_stats(user_id), &stats)?;
                    Ok(true)
                }
            }
        })
    }

    /// Point read of the public profile.
    pub async fn get_profile(&self, user_id: Uuid) -> EngineResult<UserProfile> {
        self.store
            .get(&paths::user(user_id))?
            .ok_or_else(|| EngineError::not_found("User", user_id))
    }

    /// Profile as the client loads it: runs the opportunistic maintenance
    /// passes first - streak protection and the lazy weekly reset - then
    /// returns the fresh document.
    pub async fn load_profile(&self, user_id: Uuid, now: Timestamp) -> EngineResult<UserProfile> {
        self.sync_streak(user_id, now).await?;
        self.lazy_weekly_reset(user_id, now).await?;
        self.get_profile(user_id).await
    }

    /// Read both user documents in one transaction (used by tests and the
    /// admin surface; regular handlers go through the operation methods).
    pub async fn get_user_pair(&self, user_id: Uuid) -> EngineResult<(UserProfile, UserStats)> {
        self.store.run_transaction(|tx| read_user_pair(tx, user_id))
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{engine, t0};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let (engine, _) = engine();
        let uid = Uuid::now_v7();
        assert!(engine.ensure_user(uid, "Ada", "Berlin", t0()).await.unwrap());
        assert!(!engine.ensure_user(uid, "Ada", "Berlin", t0()).await.unwrap());
        let profile = engine.get_profile(uid).await.unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.level, 1);
    }

    #[tokio::test]
    async fn test_ensure_user_refreshes_display_name() {
        let (engine, _) = engine();
        let uid = Uuid::now_v7();
        engine.ensure_user(uid, "Ada", "Berlin", t0()).await.unwrap();
        engine.ensure_user(uid, "Ada L.", "Berlin", t0()).await.unwrap();
        assert_eq!(engine.get_profile(uid).await.unwrap().name, "Ada L.");
    }

    #[tokio::test]
    async fn test_get_profile_missing_user() {
        let (engine, _) = engine();
        let err = engine.get_profile(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, squadquest_core::EngineError::NotFound { .. }));
    }
}
