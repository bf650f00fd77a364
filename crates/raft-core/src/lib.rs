//! # raft-core
//!
//! why: keep the raft log's index/term bookkeeping in pure, portable rust
//! relations: raft-storage persists what this crate buffers
//! what: entry and snapshot model, hard state, unstable log, invariant errors

pub mod error;
pub mod log;
pub mod node;
pub mod snapshot;
pub mod unstable;

pub use error::{check_contiguous, FatalInvariant};
pub use log::{limit_size, LogEntry, NO_LIMIT};
pub use node::{HardState, NodeId};
pub use snapshot::{ConfState, Snapshot, SnapshotMetadata};
pub use unstable::UnstableLog;
