//! Record Module
//!
//! The codec boundary between domain fields and the opaque record strings
//! the storage layer works with.
//!
//! ## Record Format
//! ```text
//! <key>,<field_2>,<field_3>,...,<field_n>
//! ```
//! - Fields are joined by [`DELIMITER`]; embedded delimiters are not escaped,
//!   so a field must never contain one.
//! - The primary key is always the first field and is compared as a string.

mod zip_record;

pub use zip_record::{parse_csv_line, ZipRecord, CSV_HEADER};

/// Field delimiter for every record
pub const DELIMITER: char = ',';

/// Extract the primary key: everything before the first delimiter
///
/// A record without a delimiter is all key.
pub fn primary_key(record: &str) -> &str {
    match record.find(DELIMITER) {
        Some(pos) => &record[..pos],
        None => record,
    }
}

/// Get the `n`-th field (0-based) of a record
pub fn field(record: &str, n: usize) -> Option<&str> {
    record.split(DELIMITER).nth(n)
}

/// Join fields into a record string
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, f) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(f.as_ref());
    }
    out
}
