//! Block
//!
//! A fixed-capacity container of variable-length records with links to its
//! logical neighbours.

use std::fmt;
use std::io::{self, Write};

use crate::error::{Result, StoreError};
use crate::record::primary_key;

use super::{BlockId, NO_LINK};

/// One leaf block of a sequence set
///
/// ## Ordering
/// A block remembers whether its records are known to be ascending by key.
/// - `insert_sorted()` keeps the order and refuses to run on a block that
///   has lost it
/// - `try_add()` appends blindly and clears the flag if the append lands out
///   of order
/// - `sort_records()` restores the order
///
/// ## Accounting
/// `used_bytes` is the sum of record lengths. Delimiters and link metadata
/// are not budgeted.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Relative block number, stable for the block's lifetime
    id: BlockId,
    /// Logical predecessor
    prev_id: Option<BlockId>,
    /// Logical successor
    next_id: Option<BlockId>,
    /// Maximum bytes of record text
    capacity: usize,
    /// Bytes of record text currently held
    used_bytes: usize,
    records: Vec<String>,
    /// Records are known to be ascending by primary key
    sorted: bool,
}

impl Block {
    /// Create an empty, unlinked block
    pub fn new(id: BlockId, capacity: usize) -> Self {
        Self {
            id,
            prev_id: None,
            next_id: None,
            capacity,
            used_bytes: 0,
            records: Vec::new(),
            sorted: true,
        }
    }

    /// Rebuild a block from previously persisted parts
    pub(crate) fn from_parts(
        id: BlockId,
        prev_id: Option<BlockId>,
        next_id: Option<BlockId>,
        capacity: usize,
        records: Vec<String>,
    ) -> Self {
        let used_bytes = records.iter().map(String::len).sum();
        let sorted = is_ascending(&records);
        Self {
            id,
            prev_id,
            next_id,
            capacity,
            used_bytes,
            records,
            sorted,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a record to the end if it fits
    ///
    /// Returns `false` (and changes nothing) when the block lacks room.
    pub fn try_add(&mut self, record: impl Into<String>) -> bool {
        let record = record.into();
        if !self.has_space(&record) {
            return false;
        }

        if let Some(last) = self.records.last() {
            if primary_key(&record) < primary_key(last) {
                self.sorted = false;
            }
        }

        self.used_bytes += record.len();
        self.records.push(record);
        true
    }

    /// Insert a record before the first record whose key is not less than
    /// its own, keeping the block ascending
    ///
    /// Equal keys keep insertion order with the newcomer placed first.
    /// Capacity is NOT checked here; callers check `has_space()` first.
    /// Returns the position the record was inserted at.
    pub fn insert_sorted(&mut self, record: impl Into<String>) -> Result<usize> {
        if !self.sorted {
            return Err(StoreError::UnsortedBlock(self.id));
        }

        let record = record.into();
        let pos = self.lower_bound(primary_key(&record));

        self.used_bytes += record.len();
        self.records.insert(pos, record);
        Ok(pos)
    }

    /// Remove the first record whose key equals `key`
    ///
    /// Removing a record can only restore order, so an unordered block is
    /// re-checked and regains its flag once the remaining records ascend.
    pub fn delete_by_key(&mut self, key: &str) -> bool {
        match self.records.iter().position(|r| primary_key(r) == key) {
            Some(pos) => {
                let removed = self.records.remove(pos);
                self.used_bytes -= removed.len();
                if !self.sorted {
                    self.sorted = is_ascending(&self.records);
                }
                true
            }
            None => false,
        }
    }

    /// Stable-sort the records by key and mark the block as ordered again
    pub fn sort_records(&mut self) {
        self.records.sort_by(|a, b| primary_key(a).cmp(primary_key(b)));
        self.sorted = true;
    }

    /// Link this block directly after `prev` in logical order
    ///
    /// Takes over `prev`'s old successor. The caller owns the successor block
    /// and must point its `prev_id` here.
    pub fn link_after(&mut self, prev: &mut Block) {
        self.prev_id = Some(prev.id);
        self.next_id = prev.next_id;
        prev.next_id = Some(self.id);
    }

    pub fn set_prev_id(&mut self, id: Option<BlockId>) {
        self.prev_id = id;
    }

    pub fn set_next_id(&mut self, id: Option<BlockId>) {
        self.next_id = id;
    }

    /// Move every record out, leaving the block empty
    pub(crate) fn take_records(&mut self) -> Vec<String> {
        self.used_bytes = 0;
        self.sorted = true;
        std::mem::take(&mut self.records)
    }

    /// Replace the contents with records that are already ascending
    pub(crate) fn fill_sorted(&mut self, records: Vec<String>) {
        debug_assert!(is_ascending(&records));
        self.used_bytes = records.iter().map(String::len).sum();
        self.records = records;
        self.sorted = true;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `record` would fit: `used_bytes + len <= capacity`
    pub fn has_space(&self, record: &str) -> bool {
        self.used_bytes + record.len() <= self.capacity
    }

    /// Bytes left before the block is full; zero for an overfilled block
    pub fn free_space(&self) -> usize {
        self.capacity.saturating_sub(self.used_bytes)
    }

    /// Key of the highest record, `None` for an empty block
    ///
    /// For an ordered block this is the last record's key. An unordered block
    /// is scanned for its maximum instead.
    pub fn highest_key(&self) -> Option<&str> {
        if self.sorted {
            self.records.last().map(|r| primary_key(r))
        } else {
            self.records.iter().map(|r| primary_key(r)).max()
        }
    }

    /// Key of the lowest record, `None` for an empty block
    pub fn lowest_key(&self) -> Option<&str> {
        if self.sorted {
            self.records.first().map(|r| primary_key(r))
        } else {
            self.records.iter().map(|r| primary_key(r)).min()
        }
    }

    /// Find the first record with the given key
    ///
    /// Ordered blocks stop at the first larger key.
    pub fn find(&self, key: &str) -> Option<&str> {
        for record in &self.records {
            let k = primary_key(record);
            if k == key {
                return Some(record);
            }
            if self.sorted && k > key {
                return None;
            }
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Keys in storage order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| primary_key(r))
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn prev_id(&self) -> Option<BlockId> {
        self.prev_id
    }

    pub fn next_id(&self) -> Option<BlockId> {
        self.next_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    // =========================================================================
    // Text Output
    // =========================================================================

    /// Write the block in dump format
    ///
    /// ```text
    /// BLOCK <id> PREV=<prev_id> NEXT=<next_id> COUNT=<n>
    /// <record_1>
    /// ...
    /// END_BLOCK
    /// ```
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "BLOCK {} PREV={} NEXT={} COUNT={}",
            self.id,
            link_to_text(self.prev_id),
            link_to_text(self.next_id),
            self.records.len()
        )?;
        for record in &self.records {
            writeln!(out, "{}", record)?;
        }
        writeln!(out, "END_BLOCK")
    }

    /// One line: links followed by every key, for logical-order dumps
    pub fn key_line(&self) -> String {
        let mut line = format!(
            "RBN {} PREV={} NEXT={} |",
            self.id,
            link_to_text(self.prev_id),
            link_to_text(self.next_id)
        );
        for key in self.keys() {
            line.push(' ');
            line.push_str(key);
        }
        line
    }

    fn lower_bound(&self, key: &str) -> usize {
        self.records
            .iter()
            .position(|r| primary_key(r) >= key)
            .unwrap_or(self.records.len())
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block RBN: {}, Records: {}, Free space: {}",
            self.id,
            self.records.len(),
            self.free_space()
        )
    }
}

fn is_ascending(records: &[String]) -> bool {
    records
        .windows(2)
        .all(|pair| primary_key(&pair[0]) <= primary_key(&pair[1]))
}

/// Render a link the way the dump stores it (`-1` for none)
pub(crate) fn link_to_text(link: Option<BlockId>) -> String {
    match link {
        Some(id) => id.to_string(),
        None => NO_LINK.to_string(),
    }
}
