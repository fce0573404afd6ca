//! Storage Module
//!
//! Leaf level of the store: fixed-capacity blocks of sorted records chained
//! into a blocked sequence set.
//!
//! ## Responsibilities
//! - Enforce per-block capacity
//! - Keep records ascending by primary key within and across blocks
//! - Maintain prev/next links so the chain can be walked in key order
//! - Persist the chain as a human-readable dump
//!
//! ## Physical vs Logical Order
//! ```text
//!  physical (Vec order):  [ RBN 0 ] [ RBN 1 ] [ RBN 2 ]
//!  logical  (links):      RBN 0 ──▶ RBN 2 ──▶ RBN 1
//! ```
//! A block id always equals its position in the Vec. Splitting a full block
//! appends the new block physically at the end but links it logically right
//! after the block it was split from.
//!
//! ## Dump Format (text, a header then one section per block in physical order)
//! ```text
//! HEADER,<block_capacity>,<record_count>
//! BLOCK <id> PREV=<prev_id> NEXT=<next_id> COUNT=<n>
//! <record_1>
//! ...
//! <record_n>
//! END_BLOCK
//! ```
//! A missing link is written as `-1`.

mod block;
mod dump;
mod sequence_set;

pub use block::Block;
pub use dump::{read_dump, write_dump, Dump};
pub use sequence_set::{BlockedSequenceSet, SetSummary};

/// Relative block number
pub type BlockId = u32;

/// Text used for "no link" in the dump
pub(crate) const NO_LINK: i64 = -1;
