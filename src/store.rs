//! Store Module
//!
//! Coordinates a blocked sequence set and its sparse index.
//!
//! ## Responsibilities
//! - Load the block dump on startup and build the index
//! - Route lookups through the index while it is fresh
//! - Track index staleness after inserts and deletes
//! - Flush the dump and index files

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::index::SparseIndex;
use crate::storage::{BlockId, BlockedSequenceSet, SetSummary};

/// State guarded by the store's single lock
struct StoreState {
    set: BlockedSequenceSet,
    index: SparseIndex,
    /// Set after any mutation; cleared by a rebuild
    index_stale: bool,
}

/// The record store
///
/// ## Concurrency Model
/// Neither the sequence set nor the index locks internally. The store holds
/// both behind ONE `RwLock` so that a mutation and the staleness flag it sets
/// (or a lookup and the block it dispatches to) are observed together.
/// - Mutations (insert/add/delete/rebuild/flush): write lock
/// - Lookups: read lock, many concurrent readers
pub struct Store {
    /// Store configuration
    config: StoreConfig,

    /// Sequence set + index
    state: RwLock<StoreState>,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Load the block dump if one exists (its stored block capacity wins)
    /// 3. Build the index over the loaded blocks
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let dump_path = config.dump_path();
        let set = if dump_path.exists() {
            BlockedSequenceSet::load_from_file(&dump_path, config.block_capacity)?
        } else {
            BlockedSequenceSet::from_config(&config)
        };

        let index = SparseIndex::build(&set);
        tracing::info!(
            data_dir = %config.data_dir.display(),
            records = set.total_records(),
            blocks = set.total_blocks(),
            block_capacity = set.block_capacity(),
            "store opened"
        );

        Ok(Self {
            config,
            state: RwLock::new(StoreState {
                set,
                index,
                index_stale: false,
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = StoreConfig::builder().data_dir(path).build();
        Self::open(config)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Sorted insert; the index becomes stale
    pub fn insert(&self, record: impl Into<String>) -> Result<BlockId> {
        let mut state = self.state.write();
        let id = state.set.insert(record)?;
        state.index_stale = true;
        Ok(id)
    }

    /// Bulk append; the index becomes stale
    pub fn add_record(&self, record: impl Into<String>) -> Result<BlockId> {
        let mut state = self.state.write();
        let id = state.set.add_record(record)?;
        state.index_stale = true;
        Ok(id)
    }

    /// Delete by key; the index becomes stale only if something was removed
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.write();
        let deleted = state.set.delete(key);
        if deleted {
            state.index_stale = true;
        }
        deleted
    }

    /// Rebuild the index from the current blocks, returning its entry count
    pub fn rebuild_index(&self) -> usize {
        let mut state = self.state.write();
        Self::rebuild_locked(&mut state);
        state.index.len()
    }

    /// Write the block dump and a fresh index to the data directory
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.index_stale {
            Self::rebuild_locked(&mut state);
        }
        state.set.write_to_file()?;
        state.index.write_to_file(&self.config.index_path())?;
        Ok(())
    }

    /// Flush and consume the store
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Look up a record by key
    ///
    /// Goes through the index while it is fresh and falls back to a full scan
    /// once a mutation has made it stale.
    pub fn search(&self, key: &str) -> Option<String> {
        let state = self.state.read();
        let found = if state.index_stale {
            tracing::debug!(key, "index stale, scanning all blocks");
            state.set.search(key)
        } else {
            state.index.search(&state.set, key)
        };
        found.map(str::to_string)
    }

    /// Every record for a state, in key order
    pub fn search_by_state(&self, state_code: &str) -> Vec<String> {
        self.state.read().set.search_by_state(state_code)
    }

    /// Run `f` against the sequence set and index under the read lock
    pub fn with_view<R>(&self, f: impl FnOnce(&BlockedSequenceSet, &SparseIndex) -> R) -> R {
        let state = self.state.read();
        f(&state.set, &state.index)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn is_index_stale(&self) -> bool {
        self.state.read().index_stale
    }

    pub fn total_records(&self) -> usize {
        self.state.read().set.total_records()
    }

    pub fn total_blocks(&self) -> usize {
        self.state.read().set.total_blocks()
    }

    /// Capacity of the blocks in use, which is the stored one after a
    /// reopen even when the config asked for another
    pub fn block_capacity(&self) -> usize {
        self.state.read().set.block_capacity()
    }

    pub fn index_len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn summary(&self) -> SetSummary {
        self.state.read().set.summary()
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn rebuild_locked(state: &mut StoreState) {
        state.index = SparseIndex::build(&state.set);
        state.index_stale = false;
    }
}
