//! Index Module
//!
//! Single-level sparse primary index over a blocked sequence set.
//!
//! ## Shape
//! ```text
//!  entries (sorted by highest key)        sequence set
//!  ┌──────────────┬──────────┐
//!  │ highest_key  │ block_id │
//!  ├──────────────┼──────────┤
//!  │ "10002"      │    0     │ ──────▶ [ 10001 10002 ]
//!  │ "60601"      │    2     │ ──────▶ [ 60600 60601 ]
//!  │ "99950"      │    1     │ ──────▶ [ 70001 99950 ]
//!  └──────────────┴──────────┘
//! ```
//!
//! One entry per non-empty block. The index is a snapshot: any insert or
//! delete on the underlying set leaves it stale until it is rebuilt. There is
//! no incremental maintenance.
//!
//! ## File Format (CSV)
//! ```text
//! <highest_key>,<block_id>
//! ```

mod sparse;

pub use sparse::{IndexEntry, SparseIndex};
