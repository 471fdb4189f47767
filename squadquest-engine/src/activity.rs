//! Global activity feed.
//!
//! Entries are append-only and write-once: the engine stages them inside the
//! same transaction as the reward they describe and never updates or deletes
//! them afterwards.

use crate::{paths, RewardEngine};
use squadquest_core::{ActivityEntry, EngineResult, StoreResult};
use squadquest_store::{collections, Transaction};

/// Stage an activity entry in the current transaction.
pub(crate) fn record(tx: &mut Transaction<'_>, entry: &ActivityEntry) -> StoreResult<()> {
    tx.set(&paths::activity(entry.activity_id), entry)
}

impl RewardEngine {
    /// Most recent activity entries, newest first.
    pub async fn recent_activity(&self, limit: usize) -> EngineResult<Vec<ActivityEntry>> {
        let mut entries: Vec<ActivityEntry> = self.store().scan(collections::GLOBAL_ACTIVITY)?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }
}
