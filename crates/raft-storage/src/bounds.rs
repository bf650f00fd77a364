//! # bounds
//!
//! why: one place for the first/last index rules every backend must obey
//! relations: used by memory.rs and sled_store.rs before touching their data
//! what: LogBounds with range, term and append planning checks

use raft_core::{check_contiguous, FatalInvariant, LogEntry};

use crate::error::{Result, StorageError};

/// Retrievable index range `[first, last]`. `first - 1` is the snapshot
/// floor; `last == first - 1` means no entries are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LogBounds {
    pub first: u64,
    pub last: u64,
}

/// Where a term lookup is answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TermSource {
    Snapshot,
    Entry,
}

impl LogBounds {
    /// Bounds of a store whose snapshot ends at `floor` and whose last entry
    /// is `last`.
    pub fn new(floor: u64, last: u64) -> Self {
        Self {
            first: floor + 1,
            last,
        }
    }

    pub fn floor(&self) -> u64 {
        self.first - 1
    }

    /// Validate `[low, high)` for an entries read.
    pub fn check_range(&self, low: u64, high: u64) -> Result<()> {
        if low > high {
            return Err(StorageError::InvalidRange { low, high });
        }
        if low < self.first {
            return Err(StorageError::Compacted {
                index: low,
                first_index: self.first,
            });
        }
        if high > self.last + 1 {
            return Err(StorageError::NotFound { index: high - 1 });
        }
        Ok(())
    }

    pub fn check_term(&self, index: u64) -> Result<TermSource> {
        let floor = self.floor();
        if index == floor {
            Ok(TermSource::Snapshot)
        } else if index < floor {
            Err(StorageError::Compacted {
                index,
                first_index: self.first,
            })
        } else if index > self.last {
            Err(StorageError::NotFound { index })
        } else {
            Ok(TermSource::Entry)
        }
    }

    /// Trim `entries` to the part that still has to be written. Entries at
    /// or below the snapshot floor are dropped; a batch that would leave a
    /// hole after the last stored entry is a contract violation.
    pub fn plan_append<'a>(&self, entries: &'a [LogEntry]) -> Result<&'a [LogEntry]> {
        check_contiguous(entries)?;
        let (Some(first_new), Some(last_new)) = (entries.first(), entries.last()) else {
            return Ok(entries);
        };
        if last_new.index < self.first {
            return Ok(&entries[..0]);
        }

        let skip = self.first.saturating_sub(first_new.index) as usize;
        let entries = &entries[skip..];
        let start = entries[0].index;
        if start > self.last + 1 {
            return Err(FatalInvariant::LogGap {
                expected: self.last + 1,
                found: start,
            }
            .report()
            .into());
        }
        Ok(entries)
    }

    /// Check that a snapshot may be cut at `index`.
    pub fn check_snapshot(&self, index: u64) -> Result<()> {
        if index <= self.floor() {
            return Err(StorageError::Compacted {
                index,
                first_index: self.first,
            });
        }
        if index > self.last {
            return Err(StorageError::NotFound { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ents(term: u64, indexes: std::ops::RangeInclusive<u64>) -> Vec<LogEntry> {
        indexes.map(|i| LogEntry::new(term, i, Vec::new())).collect()
    }

    #[test]
    fn empty_store_bounds() {
        let b = LogBounds::new(0, 0);
        assert_eq!(b.first, 1);
        assert_eq!(b.floor(), 0);
        assert!(b.check_range(1, 1).is_ok());
        assert!(matches!(b.check_range(1, 2), Err(StorageError::NotFound { index: 1 })));
        assert_eq!(b.check_term(0).unwrap(), TermSource::Snapshot);
    }

    #[test]
    fn range_checks() {
        let b = LogBounds::new(3, 10);
        assert!(b.check_range(4, 11).is_ok());
        assert!(matches!(b.check_range(5, 4), Err(StorageError::InvalidRange { .. })));
        assert!(matches!(
            b.check_range(3, 5),
            Err(StorageError::Compacted { index: 3, first_index: 4 })
        ));
        assert!(matches!(b.check_range(4, 12), Err(StorageError::NotFound { index: 11 })));
    }

    #[test]
    fn term_checks() {
        let b = LogBounds::new(3, 10);
        assert_eq!(b.check_term(3).unwrap(), TermSource::Snapshot);
        assert_eq!(b.check_term(4).unwrap(), TermSource::Entry);
        assert_eq!(b.check_term(10).unwrap(), TermSource::Entry);
        assert!(matches!(b.check_term(2), Err(StorageError::Compacted { .. })));
        assert!(matches!(b.check_term(11), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn plan_append_trims_compacted_prefix() {
        let b = LogBounds::new(5, 7);
        let batch = ents(2, 3..=8);
        let planned = b.plan_append(&batch).unwrap();
        assert_eq!(planned.first().map(|e| e.index), Some(6));
        assert_eq!(planned.len(), 3);
    }

    #[test]
    fn plan_append_skips_fully_compacted_batch() {
        let b = LogBounds::new(5, 7);
        assert!(b.plan_append(&ents(1, 2..=5)).unwrap().is_empty());
    }

    #[test]
    fn plan_append_rejects_gap() {
        let b = LogBounds::new(0, 3);
        let err = b.plan_append(&ents(1, 5..=6)).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Fatal(FatalInvariant::LogGap { expected: 4, found: 5 })
        ));
    }

    #[test]
    fn snapshot_checks() {
        let b = LogBounds::new(3, 10);
        assert!(b.check_snapshot(4).is_ok());
        assert!(b.check_snapshot(10).is_ok());
        assert!(matches!(b.check_snapshot(3), Err(StorageError::Compacted { .. })));
        assert!(matches!(b.check_snapshot(11), Err(StorageError::NotFound { .. })));
    }
}
