//! Tests for the record codec
//!
//! These tests verify:
//! - Primary key and field extraction from record strings
//! - ZipRecord formatting (zero-padded keys, fixed coordinate precision)
//! - CSV line parsing and its error cases

use postalstore::record::{field, join_fields, parse_csv_line, primary_key, CSV_HEADER};
use postalstore::{StoreError, ZipRecord};

// =============================================================================
// Helper Functions
// =============================================================================

fn helena() -> ZipRecord {
    ZipRecord {
        zip: 59601,
        place_name: "Helena".to_string(),
        state: "MT".to_string(),
        county: "Lewis And Clark".to_string(),
        latitude: 46.5927,
        longitude: -112.0361,
    }
}

fn assert_format_error(line: &str) {
    assert!(
        matches!(parse_csv_line(line), Err(StoreError::RecordFormat(_))),
        "expected format error for {:?}",
        line
    );
}

// =============================================================================
// Record String Tests
// =============================================================================

#[test]
fn test_primary_key_is_first_field() {
    assert_eq!(primary_key("10001,New York,NY"), "10001");
    assert_eq!(primary_key(",empty key"), "");
}

#[test]
fn test_primary_key_without_delimiter_is_whole_record() {
    assert_eq!(primary_key("10001"), "10001");
}

#[test]
fn test_field_by_position() {
    let record = "10001,New York,NY,New York,40.7484,-73.9967";

    assert_eq!(field(record, 0), Some("10001"));
    assert_eq!(field(record, 2), Some("NY"));
    assert_eq!(field(record, 5), Some("-73.9967"));
    assert_eq!(field(record, 6), None);
}

#[test]
fn test_join_fields() {
    assert_eq!(join_fields(["10001", "New York", "NY"]), "10001,New York,NY");
    assert_eq!(join_fields(Vec::<String>::new()), "");
    assert_eq!(join_fields(vec!["solo".to_string()]), "solo");
}

// =============================================================================
// ZipRecord Formatting Tests
// =============================================================================

#[test]
fn test_to_record_canonical_form() {
    assert_eq!(
        helena().to_record(),
        "59601,Helena,MT,Lewis And Clark,46.5927,-112.0361"
    );
}

#[test]
fn test_key_is_zero_padded() {
    let mut record = helena();
    record.zip = 501;

    assert_eq!(record.key(), "00501");
    assert!(record.to_record().starts_with("00501,"));
    assert_eq!(primary_key(&record.to_record()), record.key());
}

#[test]
fn test_padded_keys_sort_numerically() {
    let low = ZipRecord { zip: 501, ..helena() };
    let high = ZipRecord { zip: 10001, ..helena() };

    assert!(low.key() < high.key());
}

#[test]
fn test_display() {
    assert_eq!(
        helena().to_string(),
        "ZIP 59601: Helena, MT, Lewis And Clark (46.5927, -112.0361)"
    );
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_csv_line() {
    let parsed = parse_csv_line("59601,Helena,MT,Lewis And Clark,46.5927,-112.0361").unwrap();

    assert_eq!(parsed, helena());
}

#[test]
fn test_parse_tolerates_line_endings() {
    let parsed = parse_csv_line("59601,Helena,MT,Lewis And Clark,46.5927,-112.0361\r\n").unwrap();

    assert_eq!(parsed, helena());
}

#[test]
fn test_parse_accepts_unpadded_zip() {
    let parsed: ZipRecord = "501,Holtsville,NY,Suffolk,40.8154,-73.0451".parse().unwrap();

    assert_eq!(parsed.zip, 501);
    assert_eq!(parsed.key(), "00501");
}

#[test]
fn test_parse_then_format_is_canonical() {
    let line = "10001,New York,NY,New York,40.7484,-73.9967";

    assert_eq!(parse_csv_line(line).unwrap().to_record(), line);
}

#[test]
fn test_parse_wrong_field_count() {
    assert_format_error("59601,Helena,MT,Lewis And Clark,46.5927");
    assert_format_error("59601,Helena,MT,Lewis,And Clark,46.5927,-112.0361");
}

#[test]
fn test_parse_bad_numbers() {
    assert_format_error("5960x,Helena,MT,Lewis And Clark,46.5927,-112.0361");
    assert_format_error("59601,Helena,MT,Lewis And Clark,north,-112.0361");
    assert_format_error("59601,Helena,MT,Lewis And Clark,46.5927,");
}

#[test]
fn test_parse_header_and_blank_lines_fail() {
    assert_format_error(CSV_HEADER);
    assert_format_error("");
    assert_format_error("   \n");
}
