//! Error types for Squad Quest operations.

use thiserror::Error;

/// Document store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Transaction aborted after {attempts} conflicting attempts")]
    Contention { attempts: u32 },

    #[error("Reads must complete before writes are staged in a transaction")]
    ReadAfterWrite,

    #[error("Batch of {size} writes exceeds the per-batch limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Serialization failed for {collection}/{id}: {reason}")]
    Serialization {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Reward engine errors.
///
/// Validation failures are raised before any write is staged, so a failed
/// operation has no partial effects. `TransientConflict` is the only
/// retryable variant, and the store layer has already retried it a bounded
/// number of times before it surfaces here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{reason}")]
    PreconditionFailed { reason: String },

    #[error("Cooldown active, try again in {retry_in_secs}s")]
    CooldownActive { retry_in_secs: i64 },

    #[error("Out of Stock")]
    OutOfStock,

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Operation conflicted with concurrent writes after {attempts} attempts")]
    TransientConflict { attempts: u32 },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl EngineError {
    /// Create a NotFound error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a PreconditionFailed error with a user-facing reason.
    pub fn precondition(reason: impl Into<String>) -> Self {
        EngineError::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// Create a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        EngineError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        EngineError::Internal {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => EngineError::Internal {
                reason: format!("unexpected missing document {}/{}", collection, id),
            },
            StoreError::Contention { attempts } => EngineError::TransientConflict { attempts },
            other => EngineError::Internal {
                reason: other.to_string(),
            },
        }
    }
}

/// Result type alias for reward engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::BatchTooLarge { size: 501, max: 500 };
        let msg = format!("{}", err);
        assert!(msg.contains("501"));
        assert!(msg.contains("500"));

        let err = StoreError::Contention { attempts: 5 };
        assert!(format!("{}", err).contains("5"));
    }

    #[test]
    fn test_engine_error_display_precondition() {
        let err = EngineError::precondition("Quest is full");
        assert_eq!(format!("{}", err), "Quest is full");
    }

    #[test]
    fn test_engine_error_display_cooldown() {
        let err = EngineError::CooldownActive { retry_in_secs: 3600 };
        assert!(format!("{}", err).contains("3600"));
    }

    #[test]
    fn test_contention_maps_to_transient_conflict() {
        let err = EngineError::from(StoreError::Contention { attempts: 5 });
        assert!(matches!(err, EngineError::TransientConflict { attempts: 5 }));
    }

    #[test]
    fn test_store_not_found_maps_to_internal() {
        // Engine code checks existence explicitly; a store-level NotFound
        // leaking through is a bug, not a user error.
        let err = EngineError::from(StoreError::NotFound {
            collection: "users".to_string(),
            id: "x".to_string(),
        });
        assert!(matches!(err, EngineError::Internal { .. }));
    }
}
