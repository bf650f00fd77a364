//! # log
//!
//! why: describe the unit that raft replicates and orders
//! relations: buffered by unstable.rs, persisted via raft-storage
//! what: LogEntry struct, entry size estimate, byte-budget truncation

use serde::{Deserialize, Serialize};

/// Byte budget meaning "return every entry in the range".
pub const NO_LIMIT: u64 = u64::MAX;

/// Fixed per-entry overhead counted by [`LogEntry::size`]: index and term.
const ENTRY_HEADER_SIZE: u64 = 16;

/// A single entry in the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The term of the leader that created this entry
    pub term: u64,
    /// The position of this entry in the log (1-indexed, 0 means none)
    pub index: u64,
    /// Opaque command bytes handed to the state machine
    pub payload: Vec<u8>,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(term: u64, index: u64, payload: Vec<u8>) -> Self {
        Self { term, index, payload }
    }

    /// Approximate encoded size, used to enforce read budgets.
    pub fn size(&self) -> u64 {
        ENTRY_HEADER_SIZE + self.payload.len() as u64
    }
}

/// Truncate `entries` to the longest prefix whose total size fits in
/// `max_size`. The first entry is always kept so an oversized entry can
/// still make progress.
pub fn limit_size(entries: &mut Vec<LogEntry>, max_size: u64) {
    if entries.len() <= 1 || max_size == NO_LIMIT {
        return;
    }

    let mut total = 0u64;
    let keep = entries
        .iter()
        .take_while(|e| {
            total = total.saturating_add(e.size());
            total <= max_size
        })
        .count()
        .max(1);

    entries.truncate(keep);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(sizes: &[usize]) -> Vec<LogEntry> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, n)| LogEntry::new(1, i as u64 + 1, vec![0u8; *n]))
            .collect()
    }

    #[test]
    fn size_counts_header_and_payload() {
        assert_eq!(LogEntry::new(3, 7, b"abcd".to_vec()).size(), 20);
        assert_eq!(LogEntry::new(3, 7, Vec::new()).size(), 16);
    }

    #[test]
    fn no_limit_keeps_everything() {
        let mut ents = entries(&[100, 100, 100]);
        limit_size(&mut ents, NO_LIMIT);
        assert_eq!(ents.len(), 3);
    }

    #[test]
    fn budget_keeps_fitting_prefix() {
        // each entry is 16 + 4 = 20 bytes
        let mut ents = entries(&[4, 4, 4, 4]);
        limit_size(&mut ents, 45);
        assert_eq!(ents.len(), 2);
        assert_eq!(ents[1].index, 2);
    }

    #[test]
    fn exact_budget_is_inclusive() {
        let mut ents = entries(&[4, 4, 4]);
        limit_size(&mut ents, 40);
        assert_eq!(ents.len(), 2);
    }

    #[test]
    fn oversized_first_entry_is_still_returned() {
        let mut ents = entries(&[1024, 4]);
        limit_size(&mut ents, 10);
        assert_eq!(ents.len(), 1);
        assert_eq!(ents[0].payload.len(), 1024);
    }

    #[test]
    fn zero_budget_returns_one_entry() {
        let mut ents = entries(&[1, 1]);
        limit_size(&mut ents, 0);
        assert_eq!(ents.len(), 1);
    }

    #[test]
    fn entry_serializes_with_payload() {
        let entry = LogEntry::new(2, 9, b"set x 1".to_vec());
        let json = serde_json::to_string(&entry).unwrap();
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
