//! # unstable
//!
//! why: hold log entries that are not yet known to be durable
//! relations: fed by the node's append path, drained as raft-storage confirms writes
//! what: UnstableLog buffer with its offset, index/term lookups and pending snapshot
//!
//! `entries[i]` has log position `i + offset`. The offset may be lower than
//! the highest index already in storage, in which case the next storage
//! write has to truncate the durable log before persisting these entries.

use tracing::{debug, warn};

use crate::error::{check_contiguous, FatalInvariant};
use crate::log::LogEntry;
use crate::snapshot::Snapshot;

/// In-memory tail of the log plus the snapshot waiting to be installed
#[derive(Debug, Clone, Default)]
pub struct UnstableLog {
    /// Incoming snapshot, if any, not yet persisted
    snapshot: Option<Snapshot>,
    /// Entries not yet written to storage
    entries: Vec<LogEntry>,
    /// Index the first buffered entry occupies
    offset: u64,
}

impl UnstableLog {
    /// Create an unseeded log. Its offset is adopted from the first append.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log whose next entry goes at `offset`, usually
    /// `storage.last_index() + 1`.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One past the last buffered index.
    fn end(&self) -> u64 {
        self.offset + self.entries.len() as u64
    }

    /// First index after the pending snapshot. Without a pending snapshot
    /// storage is the authority and `None` is returned.
    pub fn maybe_first_index(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|s| s.index() + 1)
    }

    /// Last buffered index, or the pending snapshot's index when the buffer
    /// is empty.
    pub fn maybe_last_index(&self) -> Option<u64> {
        if !self.entries.is_empty() {
            return Some(self.end() - 1);
        }
        self.snapshot.as_ref().map(|s| s.index())
    }

    /// Term at `index` if it is buffered or is exactly the pending
    /// snapshot's index.
    pub fn maybe_term(&self, index: u64) -> Option<u64> {
        if let Some(entry) = self.get(index) {
            return Some(entry.term);
        }
        match &self.snapshot {
            Some(snap) if snap.index() == index => Some(snap.term()),
            _ => None,
        }
    }

    fn get(&self, index: u64) -> Option<&LogEntry> {
        let pos = usize::try_from(index.checked_sub(self.offset)?).ok()?;
        self.entries.get(pos)
    }

    /// Drop every buffered entry up to and including `index` once storage
    /// has persisted `(index, term)`.
    ///
    /// An acknowledgement whose term no longer matches the buffer comes from
    /// a write that a newer leader has since overwritten and is ignored.
    pub fn stable_to(&mut self, index: u64, term: u64) {
        let Some(entry) = self.get(index) else {
            debug!(index, term, offset = self.offset, "stable_to outside unstable entries, ignored");
            return;
        };

        if entry.term != term {
            warn!(
                index,
                term,
                buffered_term = entry.term,
                "stable_to with mismatched term, ignored"
            );
            return;
        }

        let stable = (index - self.offset + 1) as usize;
        self.entries.drain(..stable);
        self.offset = index + 1;
        debug!(offset = self.offset, remaining = self.entries.len(), "unstable entries persisted");
    }

    /// Forget the pending snapshot once storage has installed it.
    pub fn stable_snap_to(&mut self, index: u64) {
        if self.snapshot.as_ref().is_some_and(|s| s.index() == index) {
            self.snapshot = None;
            debug!(index, "unstable snapshot persisted");
        }
    }

    /// Reset to `snapshot`: the buffer is discarded and the next entry goes
    /// right after the snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        debug!(
            index = snapshot.index(),
            term = snapshot.term(),
            dropped = self.entries.len(),
            "restore unstable log from snapshot"
        );
        self.entries.clear();
        self.offset = snapshot.index() + 1;
        self.snapshot = Some(snapshot);
    }

    /// Append `ents`, discarding any buffered entries at or after the first
    /// new index. A batch starting before the offset replaces the buffer,
    /// but never reaches back over a pending snapshot.
    pub fn truncate_and_append(&mut self, ents: Vec<LogEntry>) -> Result<(), FatalInvariant> {
        let Some(first) = ents.first().map(|e| e.index) else {
            return Ok(());
        };
        check_contiguous(&ents)?;
        if let Some(snap) = self.snapshot.as_ref().filter(|s| first <= s.index()) {
            return Err(FatalInvariant::BelowSnapshot {
                snapshot: snap.index(),
                found: first,
            }
            .report());
        }

        let end = self.end();
        if first == end {
            self.entries.extend(ents);
        } else if first <= self.offset || (self.offset == 0 && self.entries.is_empty()) {
            debug!(offset = first, "replace unstable entries");
            self.offset = first;
            self.entries = ents;
        } else if first < end {
            debug!(truncate_at = first, "truncate conflicting unstable entries");
            self.entries.truncate((first - self.offset) as usize);
            self.entries.extend(ents);
        } else {
            return Err(FatalInvariant::LogGap {
                expected: end,
                found: first,
            }
            .report());
        }

        Ok(())
    }

    /// Buffered entries in `[low, high)`.
    ///
    /// The range must lie within `[offset, offset + len]`; anything else is
    /// a caller bug and is reported as a [`FatalInvariant`].
    pub fn slice(&self, low: u64, high: u64) -> Result<&[LogEntry], FatalInvariant> {
        self.check_out_of_bounds(low, high)?;
        let lo = (low - self.offset) as usize;
        let hi = (high - self.offset) as usize;
        Ok(&self.entries[lo..hi])
    }

    fn check_out_of_bounds(&self, low: u64, high: u64) -> Result<(), FatalInvariant> {
        if low > high {
            return Err(FatalInvariant::InvertedRange { low, high }.report());
        }
        let upper = self.end();
        if low < self.offset || high > upper {
            return Err(FatalInvariant::OutOfBounds {
                low,
                high,
                lower: self.offset,
                upper,
            }
            .report());
        }
        Ok(())
    }
}
