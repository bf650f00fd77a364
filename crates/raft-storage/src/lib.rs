//! # raft-storage
//!
//! why: persist the raft log, hard state and snapshots behind one contract
//! relations: consumed by the node driving raft-core's UnstableLog
//! what: Storage trait, MemStorage for tests, SledStorage on an embedded kv engine

mod bounds;
pub mod config;
pub mod error;
pub mod memory;
pub mod sled_store;

use raft_core::{ConfState, HardState, LogEntry, Snapshot};

pub use config::{SledStorageConfig, StorageMode};
pub use error::{Result, StorageError};
pub use memory::MemStorage;
pub use sled_store::SledStorage;

/// durable storage for the raft log
///
/// reads take `&self` and may run concurrently with each other; mutations
/// take `&mut self`, so a single owner serializes them.
pub trait Storage {
    /// recover the persisted hard state and the membership of the latest snapshot
    fn initial_state(&self) -> Result<(HardState, ConfState)>;

    /// persist term, vote and commit together
    fn set_hard_state(&mut self, state: &HardState) -> Result<()>;

    /// lowest retrievable index, one past the latest snapshot
    fn first_index(&self) -> Result<u64>;

    /// highest stored index, or the snapshot index when no entries are stored
    fn last_index(&self) -> Result<u64>;

    /// term of the entry at `index`; the snapshot index itself is answered
    /// from the snapshot
    fn term(&self, index: u64) -> Result<u64>;

    /// entries in `[low, high)`, cut to `max_size` bytes but never empty for
    /// a non-empty range
    fn entries(&self, low: u64, high: u64, max_size: u64) -> Result<Vec<LogEntry>>;

    /// persist a contiguous batch, replacing any conflicting stored suffix
    fn append(&mut self, entries: &[LogEntry]) -> Result<()>;

    fn set_committed(&mut self, index: u64) -> Result<()>;

    fn committed(&self) -> Result<u64>;

    fn set_applied(&mut self, index: u64) -> Result<()>;

    fn applied(&self) -> Result<u64>;

    /// compact the log up to `index` and record a snapshot of it; without a
    /// `conf_state` the previous snapshot's membership is kept
    fn create_snapshot(&mut self, index: u64, conf_state: Option<ConfState>, data: Vec<u8>) -> Result<Snapshot>;

    /// the most recently created or applied snapshot
    fn snapshot(&self) -> Result<Snapshot>;

    /// install a snapshot received from a peer, discarding every stored entry
    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<()>;
}
