//! # memory
//!
//! why: a Storage without durability, for tests and throwaway nodes
//! relations: implements the Storage trait from lib.rs
//! what: MemStorage holding entries, hard state and snapshot in memory

use raft_core::{ConfState, HardState, LogEntry, Snapshot};
use tracing::debug;

use crate::bounds::{LogBounds, TermSource};
use crate::error::{Result, StorageError};
use crate::Storage;

/// in-memory storage
///
/// `entries[i]` has index `snapshot index + 1 + i`. nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    hard_state: HardState,
    snapshot: Option<Snapshot>,
    entries: Vec<LogEntry>,
    committed: u64,
    applied: u64,
}

impl MemStorage {
    /// create an empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot_index(&self) -> u64 {
        self.snapshot.as_ref().map_or(0, |s| s.index())
    }

    fn bounds(&self) -> LogBounds {
        let floor = self.snapshot_index();
        LogBounds::new(floor, floor + self.entries.len() as u64)
    }

    fn position(&self, index: u64) -> usize {
        (index - self.snapshot_index() - 1) as usize
    }
}

impl Storage for MemStorage {
    fn initial_state(&self) -> Result<(HardState, ConfState)> {
        let conf_state = self
            .snapshot
            .as_ref()
            .map(|s| s.conf_state().clone())
            .unwrap_or_default();
        Ok((self.hard_state, conf_state))
    }

    fn set_hard_state(&mut self, state: &HardState) -> Result<()> {
        self.hard_state = *state;
        debug!(term = state.term, commit = state.commit, "set hard state in memory");
        Ok(())
    }

    fn first_index(&self) -> Result<u64> {
        Ok(self.bounds().first)
    }

    fn last_index(&self) -> Result<u64> {
        Ok(self.bounds().last)
    }

    fn term(&self, index: u64) -> Result<u64> {
        match self.bounds().check_term(index)? {
            TermSource::Snapshot => Ok(self.snapshot.as_ref().map_or(0, |s| s.term())),
            TermSource::Entry => Ok(self.entries[self.position(index)].term),
        }
    }

    fn entries(&self, low: u64, high: u64, max_size: u64) -> Result<Vec<LogEntry>> {
        self.bounds().check_range(low, high)?;
        if low == high {
            return Ok(Vec::new());
        }
        let mut ents = self.entries[self.position(low)..self.position(high)].to_vec();
        raft_core::limit_size(&mut ents, max_size);
        Ok(ents)
    }

    fn append(&mut self, entries: &[LogEntry]) -> Result<()> {
        let entries = self.bounds().plan_append(entries)?;
        let Some(first) = entries.first() else {
            return Ok(());
        };

        let keep = self.position(first.index);
        self.entries.truncate(keep);
        self.entries.extend_from_slice(entries);
        debug!(first = first.index, last = self.bounds().last, "appended entries in memory");
        Ok(())
    }

    fn set_committed(&mut self, index: u64) -> Result<()> {
        self.committed = index;
        debug!(index, "set committed in memory");
        Ok(())
    }

    fn committed(&self) -> Result<u64> {
        Ok(self.committed)
    }

    fn set_applied(&mut self, index: u64) -> Result<()> {
        self.applied = index;
        debug!(index, "set applied in memory");
        Ok(())
    }

    fn applied(&self) -> Result<u64> {
        Ok(self.applied)
    }

    fn create_snapshot(&mut self, index: u64, conf_state: Option<ConfState>, data: Vec<u8>) -> Result<Snapshot> {
        self.bounds().check_snapshot(index)?;

        let term = self.term(index)?;
        let conf_state = conf_state
            .or_else(|| self.snapshot.as_ref().map(|s| s.conf_state().clone()))
            .unwrap_or_default();
        let compacted = self.position(index) + 1;

        let snapshot = Snapshot::new(index, term, conf_state, data);
        self.entries.drain(..compacted);
        self.snapshot = Some(snapshot.clone());
        debug!(index, term, "created snapshot in memory");
        Ok(snapshot)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        self.snapshot.clone().ok_or(StorageError::SnapshotUnavailable)
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        let current = self.snapshot_index();
        if snapshot.index() <= current {
            return Err(StorageError::SnapshotOutOfDate {
                index: snapshot.index(),
                current,
            });
        }

        let (index, term) = (snapshot.index(), snapshot.term());
        let dropped = self.entries.len();
        self.entries.clear();
        self.snapshot = Some(snapshot);
        debug!(index, term, dropped, "applied snapshot in memory");
        Ok(())
    }
}
