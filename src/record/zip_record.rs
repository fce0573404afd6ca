//! ZipRecord
//!
//! Typed view of one US postal-code row and its canonical record string.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

use super::DELIMITER;

/// Column header line of the postal-code CSV, skipped on ingest
pub const CSV_HEADER: &str = "zip,place_name,state,county,latitude,longitude";

/// Number of fields in a canonical record
const FIELD_COUNT: usize = 6;

/// One postal-code row
#[derive(Debug, Clone, PartialEq)]
pub struct ZipRecord {
    pub zip: u32,
    pub place_name: String,
    /// Two-letter state abbreviation
    pub state: String,
    pub county: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ZipRecord {
    /// Primary key as stored: five digits, zero-padded
    ///
    /// Padding keeps string order equal to numeric order ("00501" < "10001").
    pub fn key(&self) -> String {
        format!("{:05}", self.zip)
    }

    /// Canonical comma-joined record text
    pub fn to_record(&self) -> String {
        format!(
            "{:05},{},{},{},{:.4},{:.4}",
            self.zip, self.place_name, self.state, self.county, self.latitude, self.longitude
        )
    }
}

impl fmt::Display for ZipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ZIP {:05}: {}, {}, {} ({}, {})",
            self.zip, self.place_name, self.state, self.county, self.latitude, self.longitude
        )
    }
}

impl FromStr for ZipRecord {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.trim_end_matches(&['\r', '\n'][..]).split(DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(StoreError::RecordFormat(format!(
                "expected {} fields, got {}: {:?}",
                FIELD_COUNT,
                fields.len(),
                s
            )));
        }

        let zip = fields[0]
            .trim()
            .parse::<u32>()
            .map_err(|e| StoreError::RecordFormat(format!("bad zip {:?}: {}", fields[0], e)))?;
        let latitude = parse_coordinate(fields[4], "latitude")?;
        let longitude = parse_coordinate(fields[5], "longitude")?;

        Ok(Self {
            zip,
            place_name: fields[1].trim().to_string(),
            state: fields[2].trim().to_string(),
            county: fields[3].trim().to_string(),
            latitude,
            longitude,
        })
    }
}

/// Parse one line of the postal-code CSV
///
/// The CSV column order is the canonical record order, so this is the same
/// parser with blank lines and the column header reported as format errors
/// the caller may skip.
pub fn parse_csv_line(line: &str) -> Result<ZipRecord> {
    let line = line.trim();
    if line.is_empty() {
        return Err(StoreError::RecordFormat("blank line".to_string()));
    }
    line.parse()
}

fn parse_coordinate(raw: &str, name: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| StoreError::RecordFormat(format!("bad {} {:?}: {}", name, raw, e)))
}
