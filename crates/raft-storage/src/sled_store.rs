//! # sled_store
//!
//! why: keep the raft log durable across crashes with an embedded kv engine
//! relations: implements the Storage trait from lib.rs, configured by config.rs
//! what: SledStorage, big-endian entry keys, cached bounds and hard state
//!
//! Layout: the `logs` tree maps an 8-byte big-endian index to a json
//! encoded entry, so the engine's key order is log order. The `meta` tree
//! holds the hard state, the snapshot (metadata and raw data under separate
//! keys) and the committed/applied markers. Every mutation is one sled batch
//! or one transaction over both trees.

use std::convert::Infallible;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use raft_core::{ConfState, HardState, LogEntry, Snapshot, SnapshotMetadata};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{TransactionError, TransactionResult};
use sled::Transactional;
use tracing::{debug, info};

use crate::bounds::{LogBounds, TermSource};
use crate::config::SledStorageConfig;
use crate::error::{Result, StorageError};
use crate::Storage;

const LOGS_TREE: &str = "logs";
const META_TREE: &str = "meta";

const HARD_STATE_KEY: &[u8] = b"hard_state";
const SNAPSHOT_META_KEY: &[u8] = b"snapshot_meta";
const SNAPSHOT_DATA_KEY: &[u8] = b"snapshot_data";
const COMMITTED_KEY: &[u8] = b"committed";
const APPLIED_KEY: &[u8] = b"applied";

/// Storage backed by a sled database.
///
/// First/last index, hard state and snapshot metadata are cached after
/// open. A cache is updated as soon as the write that changes it has
/// committed to the engine, before the write is flushed.
#[derive(Debug)]
pub struct SledStorage {
    db: sled::Db,
    logs: sled::Tree,
    meta: sled::Tree,
    flush_every_write: bool,
    hard_state: HardState,
    snapshot: Option<SnapshotMetadata>,
    bounds: LogBounds,
}

impl SledStorage {
    /// Open or create a store at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(&SledStorageConfig::new(path.as_ref()))
    }

    pub fn with_config(config: &SledStorageConfig) -> Result<Self> {
        let db = config.to_sled().open()?;
        let logs = db.open_tree(LOGS_TREE)?;
        let meta = db.open_tree(META_TREE)?;

        let hard_state = get_meta::<HardState>(&meta, HARD_STATE_KEY)?.unwrap_or_default();
        let snapshot = get_meta::<SnapshotMetadata>(&meta, SNAPSHOT_META_KEY)?;
        let floor = snapshot.as_ref().map_or(0, |s| s.index);
        let bounds = recover_bounds(&logs, floor)?;

        info!(
            path = %config.path.display(),
            first_index = bounds.first,
            last_index = bounds.last,
            term = hard_state.term,
            "opened sled log storage"
        );

        Ok(Self {
            db,
            logs,
            meta,
            flush_every_write: config.flush_every_write,
            hard_state,
            snapshot,
            bounds,
        })
    }

    /// Flush outstanding writes and release the engine.
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        info!(last_index = self.bounds.last, "closed sled log storage");
        Ok(())
    }

    /// True when no entry is stored, whatever the snapshot covers.
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    fn flush(&self) -> Result<()> {
        if self.flush_every_write {
            self.db.flush()?;
        }
        Ok(())
    }

    fn put_meta<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.meta.insert(key, bytes)?;
        Ok(())
    }

    fn read_entry(&self, index: u64) -> Result<LogEntry> {
        let value = self
            .logs
            .get(id_to_bin(index))?
            .ok_or_else(|| StorageError::Corrupted(format!("entry {index} missing inside stored range")))?;
        decode_entry(index, &value)
    }

    /// Batch removing every stored entry in `[from, to]`.
    fn purge_batch(from: u64, to: u64) -> sled::Batch {
        let mut batch = sled::Batch::default();
        for index in from..=to {
            batch.remove(id_to_bin(index).as_slice());
        }
        batch
    }

    /// Atomically drop the entries in `purge` and record `snapshot` as the
    /// current one, leaving the log at `bounds`.
    fn install_snapshot(&mut self, purge: &sled::Batch, snapshot: &Snapshot, bounds: LogBounds) -> Result<()> {
        let meta_bytes = serde_json::to_vec(&snapshot.metadata)?;
        let data = snapshot.data.as_slice();

        let res: TransactionResult<(), Infallible> = (&self.logs, &self.meta).transaction(|(logs, meta)| {
            logs.apply_batch(purge)?;
            meta.insert(SNAPSHOT_META_KEY, meta_bytes.as_slice())?;
            meta.insert(SNAPSHOT_DATA_KEY, data)?;
            Ok(())
        });
        res.map_err(txn_err)?;

        self.snapshot = Some(snapshot.metadata.clone());
        self.bounds = bounds;
        self.flush()
    }
}

impl Storage for SledStorage {
    fn initial_state(&self) -> Result<(HardState, ConfState)> {
        let conf_state = self
            .snapshot
            .as_ref()
            .map(|s| s.conf_state.clone())
            .unwrap_or_default();
        Ok((self.hard_state, conf_state))
    }

    fn set_hard_state(&mut self, state: &HardState) -> Result<()> {
        self.put_meta(HARD_STATE_KEY, state)?;
        self.hard_state = *state;
        self.flush()
    }

    fn first_index(&self) -> Result<u64> {
        Ok(self.bounds.first)
    }

    fn last_index(&self) -> Result<u64> {
        Ok(self.bounds.last)
    }

    fn term(&self, index: u64) -> Result<u64> {
        match self.bounds.check_term(index)? {
            TermSource::Snapshot => Ok(self.snapshot.as_ref().map_or(0, |s| s.term)),
            TermSource::Entry => Ok(self.read_entry(index)?.term),
        }
    }

    fn entries(&self, low: u64, high: u64, max_size: u64) -> Result<Vec<LogEntry>> {
        self.bounds.check_range(low, high)?;

        let from = id_to_bin(low);
        let to = id_to_bin(high);
        let mut ents = Vec::new();
        let mut size = 0u64;
        for item in self.logs.range::<&[u8], _>(from.as_slice()..to.as_slice()) {
            let (key, value) = item?;
            let expected = low + ents.len() as u64;
            if bin_to_id(&key)? != expected {
                return Err(StorageError::Corrupted(format!("entry {expected} missing inside stored range")));
            }

            let entry = decode_entry(expected, &value)?;
            size = size.saturating_add(entry.size());
            if !ents.is_empty() && size > max_size {
                return Ok(ents);
            }
            ents.push(entry);
        }

        if ents.len() as u64 != high - low {
            return Err(StorageError::Corrupted(format!(
                "expected {} entries in [{low}, {high}), found {}",
                high - low,
                ents.len()
            )));
        }
        Ok(ents)
    }

    fn append(&mut self, entries: &[LogEntry]) -> Result<()> {
        let entries = self.bounds.plan_append(entries)?;
        let (Some(first), Some(last)) = (entries.first(), entries.last()) else {
            return Ok(());
        };
        let (first, last) = (first.index, last.index);

        let mut batch = Self::purge_batch(last + 1, self.bounds.last);
        for entry in entries {
            batch.insert(id_to_bin(entry.index).as_slice(), serde_json::to_vec(entry)?);
        }
        self.logs.apply_batch(batch)?;

        let removed = self.bounds.last.saturating_sub(last);
        self.bounds.last = last;
        debug!(first, last, removed, "appended entries to sled");
        self.flush()
    }

    fn set_committed(&mut self, index: u64) -> Result<()> {
        self.put_meta(COMMITTED_KEY, &index)?;
        self.flush()
    }

    fn committed(&self) -> Result<u64> {
        Ok(get_meta(&self.meta, COMMITTED_KEY)?.unwrap_or(0))
    }

    fn set_applied(&mut self, index: u64) -> Result<()> {
        self.put_meta(APPLIED_KEY, &index)?;
        self.flush()
    }

    fn applied(&self) -> Result<u64> {
        Ok(get_meta(&self.meta, APPLIED_KEY)?.unwrap_or(0))
    }

    fn create_snapshot(&mut self, index: u64, conf_state: Option<ConfState>, data: Vec<u8>) -> Result<Snapshot> {
        self.bounds.check_snapshot(index)?;

        let term = self.read_entry(index)?.term;
        let conf_state = conf_state
            .or_else(|| self.snapshot.as_ref().map(|s| s.conf_state.clone()))
            .unwrap_or_default();
        let snapshot = Snapshot::new(index, term, conf_state, data);

        let purge = Self::purge_batch(self.bounds.first, index);
        let bounds = LogBounds::new(index, self.bounds.last);
        self.install_snapshot(&purge, &snapshot, bounds)?;

        info!(index, term, first_index = self.bounds.first, "created snapshot");
        Ok(snapshot)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let metadata = self.snapshot.clone().ok_or(StorageError::SnapshotUnavailable)?;
        let data = self
            .meta
            .get(SNAPSHOT_DATA_KEY)?
            .map(|v| v.to_vec())
            .unwrap_or_default();
        Ok(Snapshot { metadata, data })
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<()> {
        let current = self.bounds.floor();
        let index = snapshot.index();
        if index <= current {
            return Err(StorageError::SnapshotOutOfDate { index, current });
        }

        let purge = Self::purge_batch(self.bounds.first, self.bounds.last);
        self.install_snapshot(&purge, &snapshot, LogBounds::new(index, index))?;

        info!(index, term = snapshot.term(), "applied snapshot");
        Ok(())
    }
}

/// Rebuild the index cache from the snapshot floor and the first and last
/// stored keys.
fn recover_bounds(logs: &sled::Tree, floor: u64) -> Result<LogBounds> {
    let Some((first_key, _)) = logs.first()? else {
        return Ok(LogBounds::new(floor, floor));
    };
    let first = bin_to_id(&first_key)?;
    if first != floor + 1 {
        return Err(StorageError::Corrupted(format!(
            "first stored entry is {first}, snapshot ends at {floor}"
        )));
    }

    let (last_key, last_value) = logs
        .last()?
        .ok_or_else(|| StorageError::Corrupted("log tree emptied during open".to_string()))?;
    let last = bin_to_id(&last_key)?;
    decode_entry(last, &last_value)?;

    Ok(LogBounds::new(floor, last))
}

fn get_meta<T: DeserializeOwned>(meta: &sled::Tree, key: &[u8]) -> Result<Option<T>> {
    let Some(bytes) = meta.get(key)? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn decode_entry(index: u64, bytes: &[u8]) -> Result<LogEntry> {
    let entry: LogEntry = serde_json::from_slice(bytes)?;
    if entry.index != index {
        return Err(StorageError::Corrupted(format!(
            "entry stored under key {index} has index {}",
            entry.index
        )));
    }
    Ok(entry)
}

fn txn_err(e: TransactionError<Infallible>) -> StorageError {
    match e {
        TransactionError::Abort(never) => match never {},
        TransactionError::Storage(e) => StorageError::Io(e),
    }
}

/// converts an index to a key; big endian so that key order is index order
fn id_to_bin(id: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, id);
    buf
}

fn bin_to_id(buf: &[u8]) -> Result<u64> {
    if buf.len() != 8 {
        return Err(StorageError::Corrupted(format!("log key of {} bytes", buf.len())));
    }
    Ok(BigEndian::read_u64(buf))
}
