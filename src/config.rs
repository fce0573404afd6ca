//! Configuration for PostalStore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Block size used by every observed deployment
pub const DEFAULT_BLOCK_CAPACITY: usize = 512;

/// Main configuration for a PostalStore instance
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── BlockedSequenceSet.dat   (block dump)
    ///     └── SimpleIndex.txt          (sparse index, CSV)
    pub data_dir: PathBuf,

    /// Capacity of every block, in bytes of record text
    pub block_capacity: usize,

    /// File name of the block dump inside `data_dir`
    pub dump_filename: String,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// File name of the persisted index inside `data_dir`
    pub index_filename: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./postalstore_data"),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            dump_filename: "BlockedSequenceSet.dat".to_string(),
            index_filename: "SimpleIndex.txt".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Full path of the block dump
    pub fn dump_path(&self) -> PathBuf {
        self.data_dir.join(&self.dump_filename)
    }

    /// Full path of the index file
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(&self.index_filename)
    }

    /// Reject settings no store can operate with
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(StoreError::Config(
                "block_capacity must be greater than zero".to_string(),
            ));
        }
        if self.dump_filename.is_empty() || self.index_filename.is_empty() {
            return Err(StoreError::Config(
                "dump and index file names must not be empty".to_string(),
            ));
        }
        if self.dump_filename == self.index_filename {
            return Err(StoreError::Config(format!(
                "dump and index cannot share the file name {}",
                self.dump_filename
            )));
        }
        Ok(())
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the block capacity (in bytes)
    pub fn block_capacity(mut self, bytes: usize) -> Self {
        self.config.block_capacity = bytes;
        self
    }

    /// Set the block dump file name
    pub fn dump_filename(mut self, name: impl Into<String>) -> Self {
        self.config.dump_filename = name.into();
        self
    }

    /// Set the index file name
    pub fn index_filename(mut self, name: impl Into<String>) -> Self {
        self.config.index_filename = name.into();
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
