//! # node
//!
//! why: define the durable identity and voting state of a raft node
//! relations: persisted through raft-storage's Storage::set_hard_state
//! what: NodeId alias, HardState struct

use serde::{Deserialize, Serialize};

/// Unique identifier of a node in the cluster
pub type NodeId = u64;

/// Term, vote and commit index that must survive a restart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardState {
    /// Latest term this node has seen
    pub term: u64,
    /// Candidate that received our vote in `term` (if any)
    pub voted_for: Option<NodeId>,
    /// Highest index known to be committed
    pub commit: u64,
}

impl HardState {
    pub fn new(term: u64, voted_for: Option<NodeId>, commit: u64) -> Self {
        Self {
            term,
            voted_for,
            commit,
        }
    }

    /// True for a node that has never persisted any state
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_hard_state_is_empty() {
        let hs = HardState::default();
        assert!(hs.is_empty());
        assert_eq!(hs.term, 0);
        assert_eq!(hs.voted_for, None);
        assert_eq!(hs.commit, 0);
    }

    #[test]
    fn any_vote_makes_state_non_empty() {
        assert!(!HardState::new(0, Some(2), 0).is_empty());
        assert!(!HardState::new(1, None, 0).is_empty());
    }
}
