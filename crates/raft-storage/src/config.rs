//! # config
//!
//! why: let the owning node choose where and how the log is persisted
//! relations: consumed by SledStorage::with_config in sled_store.rs
//! what: SledStorageConfig, StorageMode, translation to sled::Config

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// engine tuning preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// smaller files at the cost of more compaction work
    LowSpace,
    #[default]
    HighThroughput,
}

impl From<StorageMode> for sled::Mode {
    fn from(mode: StorageMode) -> Self {
        match mode {
            StorageMode::LowSpace => sled::Mode::LowSpace,
            StorageMode::HighThroughput => sled::Mode::HighThroughput,
        }
    }
}

/// configuration for the sled-backed log store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SledStorageConfig {
    /// directory holding the database files, created if missing
    pub path: PathBuf,
    /// page cache size in bytes
    pub cache_capacity: u64,
    /// fsync after every mutating call
    pub flush_every_write: bool,
    pub mode: StorageMode,
}

impl Default for SledStorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("raft-data"),
            cache_capacity: 64 * 1024 * 1024,
            flush_every_write: true,
            mode: StorageMode::default(),
        }
    }
}

impl SledStorageConfig {
    /// default settings rooted at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub(crate) fn to_sled(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.path)
            .cache_capacity(self.cache_capacity)
            .mode(self.mode.into())
    }
}
