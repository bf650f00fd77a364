//! # error
//!
//! why: let callers branch on why a storage call failed, never on message text
//! relations: returned by every Storage method in lib.rs
//! what: StorageError taxonomy, crate-wide Result alias

use raft_core::FatalInvariant;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The index lies beyond the last stored entry.
    #[error("log entry at index {index} not found")]
    NotFound { index: u64 },

    /// The index lies below the snapshot floor. Usually answered by sending
    /// a snapshot instead of entries.
    #[error("log entry at index {index} is compacted, first available index is {first_index}")]
    Compacted { index: u64, first_index: u64 },

    #[error("invalid range [{low}, {high})")]
    InvalidRange { low: u64, high: u64 },

    #[error("no snapshot has been created")]
    SnapshotUnavailable,

    /// A snapshot handed to the store is not newer than the one it holds.
    #[error("snapshot at index {index} is not newer than current snapshot at {current}")]
    SnapshotOutOfDate { index: u64, current: u64 },

    #[error("corrupted storage: {0}")]
    Corrupted(String),

    #[error("storage engine error: {0}")]
    Io(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Fatal(#[from] FatalInvariant),
}

impl StorageError {
    /// Backend failures: engine I/O, undecodable records, inconsistent data.
    /// These are escalated by the caller rather than handled.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            StorageError::Io(_) | StorageError::Codec(_) | StorageError::Corrupted(_)
        )
    }

    /// The caller broke a contract; the log can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let compacted = StorageError::Compacted {
            index: 3,
            first_index: 5,
        };
        assert!(!compacted.is_io());
        assert!(!compacted.is_fatal());

        let corrupted = StorageError::Corrupted("bad key".to_string());
        assert!(corrupted.is_io());

        let fatal = StorageError::from(FatalInvariant::LogGap {
            expected: 4,
            found: 6,
        });
        assert!(fatal.is_fatal());
        assert!(!fatal.is_io());
    }

    #[test]
    fn messages_name_the_index() {
        let err = StorageError::NotFound { index: 42 };
        assert_eq!(err.to_string(), "log entry at index 42 not found");
    }
}
