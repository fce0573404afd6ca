//! Block Dump
//!
//! Writes a chain of blocks as human-readable text and reads it back.
//!
//! The first line is a header carrying the block capacity the blocks were
//! built with and the total record count:
//! ```text
//! HEADER,<block_capacity>,<record_count>
//! ```
//! Dumps without a header are still read, using the caller's capacity.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::record::DELIMITER;

use super::{Block, BlockId, NO_LINK};

/// Marker closing every block section
const END_MARKER: &str = "END_BLOCK";

/// Tag opening the header line
const HEADER_TAG: &str = "HEADER";

/// Contents of a dump file
#[derive(Debug, Clone, PartialEq)]
pub struct Dump {
    /// Capacity recorded in the header, or the caller's fallback
    pub block_capacity: usize,
    /// Blocks in physical order
    pub blocks: Vec<Block>,
}

/// Refuse a record the line-oriented dump could not read back
///
/// Every record occupies exactly one line, and a line equal to the end
/// marker closes its block section.
pub(crate) fn check_storable(record: &str) -> Result<()> {
    if record.contains(&['\n', '\r'][..]) {
        return Err(StoreError::RecordFormat(format!(
            "record contains a line break: {:?}",
            record
        )));
    }
    if record == END_MARKER {
        return Err(StoreError::RecordFormat(format!(
            "record cannot be the block end marker {}",
            END_MARKER
        )));
    }
    Ok(())
}

/// Write the header and all blocks in physical order, replacing any
/// existing file
pub fn write_dump(path: &Path, block_capacity: usize, blocks: &[Block]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "cannot open dump file");
            e
        })?;

    let record_count: usize = blocks.iter().map(Block::record_count).sum();
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "{}{}{}{}{}",
        HEADER_TAG, DELIMITER, block_capacity, DELIMITER, record_count
    )?;
    for block in blocks {
        block.write_to(&mut writer)?;
    }
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        blocks = blocks.len(),
        records = record_count,
        "wrote block dump"
    );
    Ok(())
}

/// Read a dump back
///
/// The header's capacity wins over `fallback_capacity`. Sections must appear
/// in physical order (section `i` holds block `i`), counts must match, every
/// block must fit its capacity, and links must point at blocks present in
/// the file.
pub fn read_dump(path: &Path, fallback_capacity: usize) -> Result<Dump> {
    let file = File::open(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "cannot open dump file");
        e
    })?;
    let reader = BufReader::new(file);

    let mut header: Option<(usize, usize)> = None;
    let mut capacity = fallback_capacity;
    let mut blocks: Vec<Block> = Vec::new();
    let mut pending: Option<PendingBlock> = None;
    let mut last_line = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        last_line = i + 1;

        pending = match pending.take() {
            None if line.trim().is_empty() => None,
            None if is_header(line) => {
                if header.is_some() || !blocks.is_empty() {
                    return Err(StoreError::DumpFormat {
                        line: last_line,
                        reason: "header must be the first line".to_string(),
                    });
                }
                let parsed = parse_dump_header(line, last_line)?;
                capacity = parsed.0;
                header = Some(parsed);
                None
            }
            None => Some(PendingBlock::parse_header(line, last_line)?),
            Some(block) if line == END_MARKER => {
                blocks.push(block.finish(blocks.len(), capacity, last_line)?);
                None
            }
            Some(mut block) => {
                block.records.push(line.to_string());
                Some(block)
            }
        };
    }

    if let Some(block) = pending {
        return Err(StoreError::DumpFormat {
            line: last_line,
            reason: format!("block {} is missing {}", block.id, END_MARKER),
        });
    }

    for block in &blocks {
        for link in [block.prev_id(), block.next_id()].into_iter().flatten() {
            if link as usize >= blocks.len() {
                return Err(StoreError::DumpFormat {
                    line: last_line,
                    reason: format!("block {} links to missing block {}", block.id(), link),
                });
            }
        }
    }

    if let Some((_, declared)) = header {
        let actual: usize = blocks.iter().map(Block::record_count).sum();
        if declared != actual {
            return Err(StoreError::DumpFormat {
                line: 1,
                reason: format!("header declares {} records but dump holds {}", declared, actual),
            });
        }
    }

    tracing::info!(
        path = %path.display(),
        blocks = blocks.len(),
        block_capacity = capacity,
        "loaded block dump"
    );
    Ok(Dump {
        block_capacity: capacity,
        blocks,
    })
}

// =============================================================================
// Parsing Helpers
// =============================================================================

/// A block section whose END_BLOCK marker has not been seen yet
struct PendingBlock {
    id: BlockId,
    prev_id: Option<BlockId>,
    next_id: Option<BlockId>,
    count: usize,
    header_line: usize,
    records: Vec<String>,
}

impl PendingBlock {
    /// "BLOCK <id> PREV=<p> NEXT=<n> COUNT=<c>"
    fn parse_header(line: &str, line_no: usize) -> Result<Self> {
        let bad = |reason: String| StoreError::DumpFormat {
            line: line_no,
            reason,
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 5 || tokens[0] != "BLOCK" {
            return Err(bad(format!("expected block header, got {:?}", line)));
        }

        let id = tokens[1]
            .parse::<BlockId>()
            .map_err(|e| bad(format!("bad block id {:?}: {}", tokens[1], e)))?;
        let prev_id = parse_link(field_value(tokens[2], "PREV=").ok_or_else(|| bad("missing PREV=".into()))?)
            .map_err(bad)?;
        let next_id = parse_link(field_value(tokens[3], "NEXT=").ok_or_else(|| bad("missing NEXT=".into()))?)
            .map_err(bad)?;
        let count_text = field_value(tokens[4], "COUNT=").ok_or_else(|| bad("missing COUNT=".into()))?;
        let count = count_text
            .parse::<usize>()
            .map_err(|e| bad(format!("bad count {:?}: {}", count_text, e)))?;

        Ok(Self {
            id,
            prev_id,
            next_id,
            count,
            header_line: line_no,
            records: Vec::with_capacity(count),
        })
    }

    fn finish(self, expected_id: usize, capacity: usize, line_no: usize) -> Result<Block> {
        if self.id as usize != expected_id {
            return Err(StoreError::DumpFormat {
                line: self.header_line,
                reason: format!("expected block {}, found block {}", expected_id, self.id),
            });
        }
        if self.records.len() != self.count {
            return Err(StoreError::DumpFormat {
                line: line_no,
                reason: format!(
                    "block {} declares {} records but holds {}",
                    self.id,
                    self.count,
                    self.records.len()
                ),
            });
        }

        let block = Block::from_parts(self.id, self.prev_id, self.next_id, capacity, self.records);
        if block.used_bytes() > capacity {
            return Err(StoreError::DumpFormat {
                line: self.header_line,
                reason: format!(
                    "block {} holds {} bytes, capacity is {}",
                    self.id,
                    block.used_bytes(),
                    capacity
                ),
            });
        }
        Ok(block)
    }
}

fn is_header(line: &str) -> bool {
    line.split(DELIMITER).next() == Some(HEADER_TAG)
}

/// "HEADER,<block_capacity>,<record_count>"
fn parse_dump_header(line: &str, line_no: usize) -> Result<(usize, usize)> {
    let bad = |reason: String| StoreError::DumpFormat {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() != 3 {
        return Err(bad(format!("expected dump header, got {:?}", line)));
    }
    let capacity = fields[1]
        .parse::<usize>()
        .map_err(|e| bad(format!("bad block capacity {:?}: {}", fields[1], e)))?;
    if capacity == 0 {
        return Err(bad("block capacity must be greater than zero".to_string()));
    }
    let records = fields[2]
        .parse::<usize>()
        .map_err(|e| bad(format!("bad record count {:?}: {}", fields[2], e)))?;
    Ok((capacity, records))
}

fn field_value<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    token.strip_prefix(prefix)
}

fn parse_link(text: &str) -> std::result::Result<Option<BlockId>, String> {
    let raw = text
        .parse::<i64>()
        .map_err(|e| format!("bad link {:?}: {}", text, e))?;
    if raw == NO_LINK {
        return Ok(None);
    }
    BlockId::try_from(raw)
        .map(Some)
        .map_err(|_| format!("link out of range: {}", raw))
}
