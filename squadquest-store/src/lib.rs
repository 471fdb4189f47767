//! Squad Quest Store - Transactional Document Store
//!
//! An in-process document store modeled on a snapshot-isolated, optimistically
//! concurrent document database. It provides the one primitive every reward
//! procedure is built on: read N documents atomically, compute, write M
//! documents atomically.
//!
//! - [`DocumentStore::run_transaction`] retries the whole read-validate-write
//!   cycle on version conflicts, a bounded number of times.
//! - Reads must complete before writes are staged; the commit validates that
//!   every document read is unchanged, so the values a committed transaction
//!   acted on were a single consistent snapshot.
//! - [`WriteBatch`] covers bulk maintenance writes, capped at
//!   [`MAX_BATCH_WRITES`] per commit.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use squadquest_core::{StoreError, StoreResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Maximum automatic retries of a conflicting transaction before the
/// contention is surfaced to the caller.
pub const MAX_TX_ATTEMPTS: u32 = 5;

/// Maximum writes accepted in a single [`WriteBatch`] commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// Logical collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const USER_STATS: &str = "user_stats";
    pub const QUESTS: &str = "quests";
    pub const QUEST_MEMBERS: &str = "quest_members";
    pub const VERIFICATIONS: &str = "verifications";
    pub const GLOBAL_ACTIVITY: &str = "global_activity";
    pub const COUPON_CODES: &str = "coupon_codes";
    pub const REDEMPTIONS: &str = "redemptions";
    pub const SHOP_ITEMS: &str = "shop_items";
    pub const META: &str = "meta";
}

// ============================================================================
// DOCUMENT ADDRESSING
// ============================================================================

/// Address of a document: collection plus id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: String,
    id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl ToString) -> Self {
        Self {
            collection: collection.into(),
            id: id.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Clone)]
struct VersionedDoc {
    version: u64,
    data: Value,
}

#[derive(Debug, Default)]
struct StoreState {
    docs: HashMap<DocPath, VersionedDoc>,
    /// Monotonic version counter. Versions are globally unique so a
    /// delete-and-recreate can never alias a version a reader observed.
    next_version: u64,
}

/// Statistics snapshot for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub committed_transactions: u64,
    pub conflicts: u64,
}

/// In-process transactional document store.
#[derive(Debug, Default)]
pub struct DocumentStore {
    state: RwLock<StoreState>,
    committed: AtomicU64,
    conflicts: AtomicU64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-transactional point read.
    pub fn get<T: DeserializeOwned>(&self, path: &DocPath) -> StoreResult<Option<T>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        match state.docs.get(path) {
            Some(doc) => Ok(Some(decode(path, &doc.data)?)),
            None => Ok(None),
        }
    }

    /// Non-transactional collection scan.
    pub fn scan<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut out = Vec::new();
        for (path, doc) in &state.docs {
            if path.collection == collection {
                out.push(decode(path, &doc.data)?);
            }
        }
        Ok(out)
    }

    /// Run `f` as an atomic transaction.
    ///
    /// The closure reads documents (recording their versions), validates,
    /// computes and stages writes. Commit re-checks every read version under
    /// the write lock; on a mismatch the whole cycle is retried, up to
    /// [`MAX_TX_ATTEMPTS`] times. Errors returned by the closure abort the
    /// transaction immediately without staging anything and are never
    /// retried - validation failures are not transient.
    pub fn run_transaction<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnMut(&mut Transaction<'_>) -> Result<T, E>,
    {
        for attempt in 1..=MAX_TX_ATTEMPTS {
            let mut tx = Transaction {
                store: self,
                reads: HashMap::new(),
                writes: Vec::new(),
            };
            let out = f(&mut tx)?;
            if self.try_commit(&tx.reads, tx.writes)? {
                self.committed.fetch_add(1, Ordering::Relaxed);
                return Ok(out);
            }
            self.conflicts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(attempt, "transaction conflict, retrying");
        }
        Err(E::from(StoreError::Contention {
            attempts: MAX_TX_ATTEMPTS,
        }))
    }

    /// Commit a bulk write batch atomically. Rejects oversized batches.
    pub fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.ops.len() > MAX_BATCH_WRITES {
            return Err(StoreError::BatchTooLarge {
                size: batch.ops.len(),
                max: MAX_BATCH_WRITES,
            });
        }
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        for (path, op) in batch.ops {
            apply_write(&mut state, path, op);
        }
        self.committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let documents = self.state.read().map(|s| s.docs.len()).unwrap_or(0);
        StoreStats {
            documents,
            committed_transactions: self.committed.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }

    /// Validate read versions and apply writes under one write lock.
    /// Returns Ok(false) on a version conflict.
    fn try_commit(
        &self,
        reads: &HashMap<DocPath, u64>,
        writes: Vec<(DocPath, WriteOp)>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        for (path, observed) in reads {
            let current = state.docs.get(path).map(|d| d.version).unwrap_or(0);
            if current != *observed {
                return Ok(false);
            }
        }
        for (path, op) in writes {
            apply_write(&mut state, path, op);
        }
        Ok(true)
    }
}

fn apply_write(state: &mut StoreState, path: DocPath, op: WriteOp) {
    match op {
        WriteOp::Set(data) => {
            state.next_version += 1;
            let version = state.next_version;
            state.docs.insert(path, VersionedDoc { version, data });
        }
        WriteOp::Merge(patch) => {
            // Update semantics: shallow-merge into an existing document,
            // skip silently when the document is absent.
            if let Some(doc) = state.docs.get_mut(&path) {
                if let (Value::Object(target), Value::Object(fields)) = (&mut doc.data, patch) {
                    for (key, value) in fields {
                        target.insert(key, value);
                    }
                    state.next_version += 1;
                    doc.version = state.next_version;
                }
            }
        }
        WriteOp::Delete => {
            state.docs.remove(&path);
        }
    }
}

fn decode<T: DeserializeOwned>(path: &DocPath, data: &Value) -> StoreResult<T> {
    serde_json::from_value(data.clone()).map_err(|e| StoreError::Serialization {
        collection: path.collection.clone(),
        id: path.id.clone(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(path: &DocPath, value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization {
        collection: path.collection.clone(),
        id: path.id.clone(),
        reason: e.to_string(),
    })
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug)]
enum WriteOp {
    Set(Value),
    Merge(Value),
    Delete,
}

/// An in-flight transaction handle.
///
/// Reads record the observed document versions; writes are staged and only
/// applied if every read version is still current at commit. All reads must
/// happen before the first write is staged.
pub struct Transaction<'a> {
    store: &'a DocumentStore,
    reads: HashMap<DocPath, u64>,
    writes: Vec<(DocPath, WriteOp)>,
}

impl Transaction<'_> {
    /// Transactional point read. Absence is recorded too, so a document
    /// created concurrently invalidates this transaction.
    pub fn get<T: DeserializeOwned>(&mut self, path: &DocPath) -> StoreResult<Option<T>> {
        self.ensure_read_phase()?;
        let state = self.store.state.read().map_err(|_| StoreError::LockPoisoned)?;
        match state.docs.get(path) {
            Some(doc) => {
                self.reads.insert(path.clone(), doc.version);
                Ok(Some(decode(path, &doc.data)?))
            }
            None => {
                self.reads.insert(path.clone(), 0);
                Ok(None)
            }
        }
    }

    /// Transactional collection scan. Every returned document is version-
    /// tracked, so any of them changing before commit aborts the attempt.
    pub fn scan<T: DeserializeOwned>(&mut self, collection: &str) -> StoreResult<Vec<T>> {
        self.ensure_read_phase()?;
        let state = self.store.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut out = Vec::new();
        for (path, doc) in &state.docs {
            if path.collection == collection {
                self.reads.insert(path.clone(), doc.version);
                out.push(decode(path, &doc.data)?);
            }
        }
        Ok(out)
    }

    /// Stage a full document write.
    pub fn set<T: Serialize>(&mut self, path: &DocPath, value: &T) -> StoreResult<()> {
        let data = encode(path, value)?;
        self.writes.push((path.clone(), WriteOp::Set(data)));
        Ok(())
    }

    /// Stage a document deletion.
    pub fn delete(&mut self, path: &DocPath) {
        self.writes.push((path.clone(), WriteOp::Delete));
    }

    fn ensure_read_phase(&self) -> StoreResult<()> {
        if self.writes.is_empty() {
            Ok(())
        } else {
            Err(StoreError::ReadAfterWrite)
        }
    }
}

// ============================================================================
// WRITE BATCH
// ============================================================================

/// Bulk write batch for maintenance passes (e.g. zeroing weekly counters).
///
/// Batches are unconditional - they do not validate read versions - so they
/// must only carry writes that are idempotent against concurrent
/// transactions. Merges bump document versions, which forces any in-flight
/// transaction on the same document to retry.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<(DocPath, WriteOp)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(&mut self, path: &DocPath, value: &T) -> StoreResult<()> {
        let data = encode(path, value)?;
        self.ops.push((path.clone(), WriteOp::Set(data)));
        Ok(())
    }

    /// Shallow-merge the given object fields into an existing document.
    pub fn merge(&mut self, path: &DocPath, fields: Value) {
        self.ops.push((path.clone(), WriteOp::Merge(fields)));
    }

    pub fn delete(&mut self, path: &DocPath) {
        self.ops.push((path.clone(), WriteOp::Delete));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
