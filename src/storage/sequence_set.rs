//! Blocked Sequence Set
//!
//! Owns the chain of leaf blocks and offers record-level add/insert/delete/
//! search without the caller reasoning about block boundaries.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::record::{field, primary_key};

use super::dump::check_storable;
use super::{read_dump, write_dump, Block, BlockId};

/// Field position of the state abbreviation in a postal-code record
const STATE_FIELD: usize = 2;

/// Ordered collection of fixed-capacity blocks
///
/// ## Two Load Paths
/// - `add_record()`: bulk append to the logical tail, no ordering work. Fast,
///   but input must already be ascending or blocks lose their sorted flag.
/// - `insert()`: sorted placement with splits. Keeps every block ascending
///   and the chain ascending in logical order.
///
/// Mixing them is allowed; a sorted insert that lands in a block the bulk
/// path disordered fails with `StoreError::UnsortedBlock`.
#[derive(Debug, Clone)]
pub struct BlockedSequenceSet {
    /// Blocks in physical order; `blocks[i].id() == i`
    blocks: Vec<Block>,

    /// Target of `write_to_file()`
    path: PathBuf,

    /// Capacity of every block created by this set
    block_capacity: usize,
}

impl BlockedSequenceSet {
    /// Create an empty set that will flush to `path`
    pub fn new(path: impl Into<PathBuf>, block_capacity: usize) -> Self {
        Self {
            blocks: Vec::new(),
            path: path.into(),
            block_capacity,
        }
    }

    /// Create an empty set from configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.dump_path(), config.block_capacity)
    }

    /// Load a previously written dump; later flushes go back to the same file
    ///
    /// The capacity stored in the dump header wins over `block_capacity`,
    /// which only applies to dumps written without a header.
    pub fn load_from_file(path: impl Into<PathBuf>, block_capacity: usize) -> Result<Self> {
        let path = path.into();
        let dump = read_dump(&path, block_capacity)?;
        if dump.block_capacity != block_capacity {
            tracing::warn!(
                path = %path.display(),
                stored = dump.block_capacity,
                requested = block_capacity,
                "keeping the block capacity stored in the dump"
            );
        }
        Ok(Self {
            blocks: dump.blocks,
            path,
            block_capacity: dump.block_capacity,
        })
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Bulk-append a record to the logical tail block
    ///
    /// Opens a new tail block when there is none or the tail lacks room.
    /// Does not sort and does not check for duplicate keys.
    /// Returns the id of the block that received the record.
    pub fn add_record(&mut self, record: impl Into<String>) -> Result<BlockId> {
        let record = record.into();
        self.check_record(&record)?;

        let tail = match self.tail() {
            Some(id) if self.blocks[id as usize].has_space(&record) => id,
            tail => self.create_block_after(tail),
        };

        let added = self.blocks[tail as usize].try_add(record);
        debug_assert!(added, "fresh or checked block must accept the record");
        Ok(tail)
    }

    /// Insert a record at its sorted position
    ///
    /// Walks blocks in logical order to the first block whose highest key is
    /// not less than the new key. An empty block passed on the way is used
    /// instead when the new key sorts before that block's first key. A key
    /// above every block goes to the tail. A block without room is split.
    ///
    /// Returns the id of the block that received the record.
    pub fn insert(&mut self, record: impl Into<String>) -> Result<BlockId> {
        let record = record.into();
        self.check_record(&record)?;
        let key = primary_key(&record).to_string();

        let mut vacancy: Option<BlockId> = None;
        let mut target: Option<BlockId> = None;

        for id in self.logical_order() {
            let block = &self.blocks[id as usize];
            match block.highest_key() {
                None => {
                    if vacancy.is_none() {
                        vacancy = Some(id);
                    }
                }
                Some(highest) if key.as_str() <= highest => {
                    if block.is_sorted() && block.contains_key(&key) {
                        return Err(StoreError::DuplicateKey(key));
                    }
                    let before_block = block.lowest_key().map_or(true, |low| key.as_str() < low);
                    target = match vacancy {
                        Some(empty) if before_block => Some(empty),
                        _ => Some(id),
                    };
                    break;
                }
                Some(_) => vacancy = None,
            }
        }

        let id = match target.or(vacancy) {
            Some(id) => id,
            None => match self.tail() {
                Some(tail) if self.blocks[tail as usize].has_space(&record) => tail,
                Some(tail) => {
                    // New maximum and the tail is full: open a fresh tail
                    let id = self.create_block_after(Some(tail));
                    self.blocks[id as usize].insert_sorted(record)?;
                    return Ok(id);
                }
                None => self.create_block_after(None),
            },
        };

        if self.blocks[id as usize].has_space(&record) {
            self.blocks[id as usize].insert_sorted(record)?;
            Ok(id)
        } else {
            self.split_insert(id, record)
        }
    }

    /// Remove the first record with `key`, scanning blocks in physical order
    pub fn delete(&mut self, key: &str) -> bool {
        for block in &mut self.blocks {
            if block.delete_by_key(key) {
                tracing::debug!(key, block = block.id(), "deleted record");
                return true;
            }
        }
        false
    }

    /// Full scan for a record by key, physical order
    ///
    /// O(total records). Baseline for callers without an index.
    pub fn search(&self, key: &str) -> Option<&str> {
        self.blocks
            .iter()
            .flat_map(|block| block.records())
            .find(|record| primary_key(record) == key)
            .map(String::as_str)
    }

    /// Every record whose state field equals `state`, in logical order
    pub fn search_by_state(&self, state: &str) -> Vec<String> {
        self.logical_order()
            .into_iter()
            .flat_map(|id| self.blocks[id as usize].records())
            .filter(|record| field(record, STATE_FIELD) == Some(state))
            .cloned()
            .collect()
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// All blocks in physical order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Look up a block by id
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id as usize)
    }

    /// Snapshot of every record in physical order
    pub fn records(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|block| block.records().iter().cloned())
            .collect()
    }

    /// First block of the logical chain (the one without a predecessor)
    pub fn head(&self) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|block| block.prev_id().is_none())
            .map(Block::id)
    }

    /// Last block of the logical chain (the one without a successor)
    ///
    /// Searched from the physical end, where bulk loads put the tail.
    pub fn tail(&self) -> Option<BlockId> {
        self.blocks
            .iter()
            .rev()
            .find(|block| block.next_id().is_none())
            .map(Block::id)
    }

    /// Block ids in logical order, following `next_id` from the head
    ///
    /// Stops on a dangling link or a revisited block.
    pub fn logical_order(&self) -> Vec<BlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        let mut seen = HashSet::with_capacity(self.blocks.len());
        let mut current = self.head();

        while let Some(id) = current {
            if !seen.insert(id) {
                tracing::warn!(block = id, "cycle in block chain");
                break;
            }
            let Some(block) = self.block(id) else {
                tracing::warn!(block = id, "dangling block link");
                break;
            };
            order.push(id);
            current = block.next_id();
        }
        order
    }

    pub fn total_records(&self) -> usize {
        self.blocks.iter().map(Block::record_count).sum()
    }

    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn summary(&self) -> SetSummary {
        SetSummary {
            path: self.path.clone(),
            total_records: self.total_records(),
            total_blocks: self.total_blocks(),
            block_lines: self.blocks.iter().map(Block::to_string).collect(),
        }
    }

    // =========================================================================
    // Persistence and Diagnostics
    // =========================================================================

    /// Write every block to `path()` in dump format
    pub fn write_to_file(&self) -> Result<()> {
        write_dump(&self.path, self.block_capacity, &self.blocks)
    }

    /// Every block with its records, in physical order
    pub fn dump_physical_order<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for block in &self.blocks {
            writeln!(out, "Block RBN {} contents:", block.id())?;
            for record in block.records() {
                writeln!(out, "{}", record)?;
            }
        }
        Ok(())
    }

    /// One key line per block, following the chain
    pub fn dump_logical_order<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for id in self.logical_order() {
            writeln!(out, "{}", self.blocks[id as usize].key_line())?;
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_record(&self, record: &str) -> Result<()> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }
        if record.len() > self.block_capacity {
            return Err(StoreError::RecordTooLarge {
                len: record.len(),
                capacity: self.block_capacity,
            });
        }
        check_storable(record)
    }

    /// Append a new empty block physically, linked logically after `after`
    fn create_block_after(&mut self, after: Option<BlockId>) -> BlockId {
        let id = self.blocks.len() as BlockId;
        let mut block = Block::new(id, self.block_capacity);

        if let Some(prev) = after {
            let old_next = self.blocks[prev as usize].next_id();
            block.link_after(&mut self.blocks[prev as usize]);
            if let Some(next) = old_next {
                self.blocks[next as usize].set_prev_id(Some(id));
            }
        }

        tracing::debug!(block = id, after = ?after, "created block");
        self.blocks.push(block);
        id
    }

    /// Insert into a full block by redistributing its records over the block
    /// and new blocks linked directly after it
    fn split_insert(&mut self, id: BlockId, record: String) -> Result<BlockId> {
        if !self.blocks[id as usize].is_sorted() {
            return Err(StoreError::UnsortedBlock(id));
        }

        let key = primary_key(&record).to_string();
        let mut records = self.blocks[id as usize].take_records();
        let pos = records
            .iter()
            .position(|r| primary_key(r) >= key.as_str())
            .unwrap_or(records.len());
        records.insert(pos, record);

        let sizes: Vec<usize> = records.iter().map(String::len).collect();
        let cuts = plan_split(&sizes, self.block_capacity);

        let mut groups = Vec::with_capacity(cuts.len() + 1);
        for &cut in cuts.iter().rev() {
            groups.push(records.split_off(cut));
        }
        groups.push(records);
        groups.reverse();

        let mut landed = id;
        let mut start = 0;
        let mut prev = id;
        for (n, group) in groups.into_iter().enumerate() {
            let block_id = if n == 0 {
                id
            } else {
                let new_id = self.create_block_after(Some(prev));
                prev = new_id;
                new_id
            };
            if (start..start + group.len()).contains(&pos) {
                landed = block_id;
            }
            start += group.len();
            self.blocks[block_id as usize].fill_sorted(group);
        }

        tracing::debug!(block = id, pieces = cuts.len() + 1, "split full block");
        Ok(landed)
    }
}

/// Choose where to cut an ascending run of records so every piece fits
///
/// Prefers a single cut closest to an even byte split. Falls back to greedy
/// packing when no single cut fits both halves. Returns the start index of
/// every piece after the first.
fn plan_split(sizes: &[usize], capacity: usize) -> Vec<usize> {
    let total: usize = sizes.iter().sum();

    let mut best: Option<(usize, usize)> = None;
    let mut prefix = 0;
    for cut in 1..sizes.len() {
        prefix += sizes[cut - 1];
        if prefix <= capacity && total - prefix <= capacity {
            let skew = prefix.abs_diff(total - prefix);
            if best.map_or(true, |(_, s)| skew < s) {
                best = Some((cut, skew));
            }
        }
    }
    if let Some((cut, _)) = best {
        return vec![cut];
    }

    let mut cuts = Vec::new();
    let mut used = 0;
    for (i, &size) in sizes.iter().enumerate() {
        if used + size > capacity {
            cuts.push(i);
            used = 0;
        }
        used += size;
    }
    cuts
}

/// Totals plus one line per block
#[derive(Debug, Clone)]
pub struct SetSummary {
    pub path: PathBuf,
    pub total_records: usize,
    pub total_blocks: usize,
    pub block_lines: Vec<String>,
}

impl fmt::Display for SetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BlockedSequenceSet Summary:")?;
        writeln!(f, "File: {}", self.path.display())?;
        writeln!(f, "Total records: {}", self.total_records)?;
        write!(f, "Total blocks: {}", self.total_blocks)?;
        for line in &self.block_lines {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}
