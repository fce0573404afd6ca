//! Sparse Index
//!
//! Binary-search dispatch from a key to the one block that may hold it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::record::DELIMITER;
use crate::storage::{BlockId, BlockedSequenceSet};

/// Highest key of one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub highest_key: String,
    pub block_id: BlockId,
}

/// Sorted (highest_key, block_id) pairs, one per non-empty block
///
/// Never owns block or record data; safe to drop and rebuild at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseIndex {
    entries: Vec<IndexEntry>,
}

impl SparseIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the highest key of every non-empty block
    ///
    /// An empty set yields an empty index.
    pub fn build(set: &BlockedSequenceSet) -> Self {
        let mut entries: Vec<IndexEntry> = set
            .blocks()
            .iter()
            .filter_map(|block| {
                block.highest_key().map(|key| IndexEntry {
                    highest_key: key.to_string(),
                    block_id: block.id(),
                })
            })
            .collect();

        // Already ordered when the set was filled through sorted inserts
        entries.sort_by(|a, b| a.highest_key.cmp(&b.highest_key));

        tracing::debug!(
            entries = entries.len(),
            blocks = set.total_blocks(),
            "built sparse index"
        );
        Self { entries }
    }

    /// Pick the candidate block for `key`
    ///
    /// Left-most entry whose highest key is >= `key`. A key above every entry
    /// maps to the block with the globally highest key. `None` only when the
    /// index is empty.
    pub fn find_block(&self, key: &str) -> Option<BlockId> {
        let pos = self
            .entries
            .partition_point(|entry| entry.highest_key.as_str() < key);

        self.entries
            .get(pos)
            .or_else(|| self.entries.last())
            .map(|entry| entry.block_id)
    }

    /// Look up a record through the index
    ///
    /// Scans only the candidate block, stopping at the first larger key when
    /// that block is ordered. A block id missing from `set` (stale index) is
    /// reported as not found.
    pub fn search<'a>(&self, set: &'a BlockedSequenceSet, key: &str) -> Option<&'a str> {
        let id = self.find_block(key)?;

        match set.block(id) {
            Some(block) => block.find(key),
            None => {
                tracing::warn!(block = id, key, "index refers to a missing block; rebuild needed");
                None
            }
        }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write one `<highest_key>,<block_id>` line per entry
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "cannot create index file");
                e
            })?;

        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(writer, "{}{}{}", entry.highest_key, DELIMITER, entry.block_id)?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), entries = self.entries.len(), "wrote index");
        Ok(())
    }

    /// Load an index written by `write_to_file()`; blank lines are skipped
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "cannot open index file");
            e
        })?;

        let mut entries = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let bad = |reason: String| StoreError::IndexFormat { line: i + 1, reason };
            let (key, id) = line
                .split_once(DELIMITER)
                .ok_or_else(|| bad(format!("missing delimiter in {:?}", line)))?;
            let block_id = id
                .trim()
                .parse::<BlockId>()
                .map_err(|e| bad(format!("bad block id {:?}: {}", id, e)))?;

            entries.push(IndexEntry {
                highest_key: key.to_string(),
                block_id,
            });
        }

        entries.sort_by(|a, b| a.highest_key.cmp(&b.highest_key));
        tracing::info!(path = %path.display(), entries = entries.len(), "loaded index");
        Ok(Self { entries })
    }

    /// Human-readable listing
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Sparse Index Dump (HighestKey, RBN):")?;
        for entry in &self.entries {
            writeln!(out, "{}, {}", entry.highest_key, entry.block_id)?;
        }
        Ok(())
    }
}
