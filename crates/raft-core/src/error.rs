//! # error
//!
//! why: give contract violations on the log a type of their own
//! relations: raised by unstable.rs, wrapped by raft-storage's StorageError
//! what: FatalInvariant enum and its fault-sink reporting

use thiserror::Error;

/// A broken precondition or structural invariant of the log.
///
/// Callers are expected never to trigger these. Once one is observed the
/// log can no longer be trusted and the owning node should stop using it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalInvariant {
    #[error("invalid slice range [{low}, {high}): low is greater than high")]
    InvertedRange { low: u64, high: u64 },

    #[error("slice [{low}, {high}) out of bound [{lower}, {upper})")]
    OutOfBounds {
        low: u64,
        high: u64,
        lower: u64,
        upper: u64,
    },

    #[error("missing log entries: expected index {expected}, found {found}")]
    LogGap { expected: u64, found: u64 },

    #[error("entry {found} is covered by the pending snapshot at {snapshot}")]
    BelowSnapshot { snapshot: u64, found: u64 },

    #[error("entries are not contiguous: {next} follows {prev}")]
    NonContiguous { prev: u64, next: u64 },
}

impl FatalInvariant {
    /// Send the violation to the fault sink and hand it back to the caller.
    pub fn report(self) -> Self {
        tracing::error!(error = %self, "raft log invariant violated");
        self
    }
}

/// Check that a batch of entries has strictly consecutive indexes.
pub fn check_contiguous(entries: &[crate::LogEntry]) -> Result<(), FatalInvariant> {
    for pair in entries.windows(2) {
        if pair[0].index.checked_add(1) != Some(pair[1].index) {
            return Err(FatalInvariant::NonContiguous {
                prev: pair[0].index,
                next: pair[1].index,
            }
            .report());
        }
    }
    Ok(())
}
