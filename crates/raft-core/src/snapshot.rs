//! # snapshot
//!
//! why: represent the compacted prefix of the log
//! relations: pending in unstable.rs until installed, produced and stored by raft-storage
//! what: ConfState membership, SnapshotMetadata, Snapshot

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Cluster membership captured by a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfState {
    /// Nodes that vote in elections and count toward quorum
    pub voters: Vec<NodeId>,
    /// Nodes that receive the log but do not vote
    pub learners: Vec<NodeId>,
}

impl ConfState {
    pub fn new(voters: Vec<NodeId>, learners: Vec<NodeId>) -> Self {
        Self { voters, learners }
    }
}

/// Position and membership of the last entry a snapshot covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub index: u64,
    pub term: u64,
    pub conf_state: ConfState,
}

/// Point-in-time state of the log up to and including `metadata.index`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    /// Opaque state machine image
    pub data: Vec<u8>,
}

impl Snapshot {
    pub fn new(index: u64, term: u64, conf_state: ConfState, data: Vec<u8>) -> Self {
        Self {
            metadata: SnapshotMetadata {
                index,
                term,
                conf_state,
            },
            data,
        }
    }

    pub fn index(&self) -> u64 {
        self.metadata.index
    }

    pub fn term(&self) -> u64 {
        self.metadata.term
    }

    pub fn conf_state(&self) -> &ConfState {
        &self.metadata.conf_state
    }

    /// A snapshot at index 0 covers nothing.
    pub fn is_empty(&self) -> bool {
        self.metadata.index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_empty() {
        assert!(Snapshot::default().is_empty());
    }

    #[test]
    fn accessors_read_metadata() {
        let snap = Snapshot::new(10, 3, ConfState::new(vec![1, 2, 3], vec![4]), b"image".to_vec());
        assert!(!snap.is_empty());
        assert_eq!(snap.index(), 10);
        assert_eq!(snap.term(), 3);
        assert_eq!(snap.conf_state().voters, vec![1, 2, 3]);
        assert_eq!(snap.conf_state().learners, vec![4]);
        assert_eq!(snap.data, b"image".to_vec());
    }
}
