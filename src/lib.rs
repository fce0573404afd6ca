//! # PostalStore
//!
//! A flat-file record store for US postal-code data with:
//! - Fixed-capacity blocks of variable-length text records
//! - A blocked sequence set keeping records sorted and blocks linked
//! - A single-level sparse index (highest key per block) for lookups
//! - Human-readable block dump and CSV index files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store                                 │
//! │             (one RwLock over set + index)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │ SparseIndex │ ───────▶ │ BlockedSequence  │
//!   │ (snapshot)  │  block   │       Set        │
//!   └─────────────┘    id    └────────┬─────────┘
//!                                     │
//!                                     ▼
//!                           ┌──────────────────┐
//!                           │ Block ◀──▶ Block │
//!                           │  (prev/next)     │
//!                           └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod storage;
pub mod index;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::StoreConfig;
pub use index::SparseIndex;
pub use record::ZipRecord;
pub use storage::{Block, BlockId, BlockedSequenceSet};
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PostalStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
