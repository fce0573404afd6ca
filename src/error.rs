//! Error types for PostalStore
//!
//! Provides a unified error type for all operations.
//!
//! Ordinary outcomes ("block full", "key not found") are plain return
//! values, not errors. Only faults land here.

use thiserror::Error;

use crate::storage::BlockId;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for PostalStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record of {len} bytes can never fit in a {capacity}-byte block")]
    RecordTooLarge { len: usize, capacity: usize },

    #[error("Empty record")]
    EmptyRecord,

    #[error("Duplicate primary key: {0}")]
    DuplicateKey(String),

    #[error("Record format error: {0}")]
    RecordFormat(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Block {0} is not sorted; sorted insert refused")]
    UnsortedBlock(BlockId),

    #[error("Block dump error at line {line}: {reason}")]
    DumpFormat { line: usize, reason: String },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index file error at line {line}: {reason}")]
    IndexFormat { line: usize, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
