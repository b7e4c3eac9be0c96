//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from a segment file
//! - Iterator functionality
//! - End-of-segment vs. corruption
//! - Checksum policies
//! - Close semantics

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use segwal::wal::{WalEntry, WalReader};
use segwal::{ChecksumPolicy, WalError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_segment() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wal-0000000000000000000.log");
    (temp_dir, path)
}

fn write_entries(path: &Path, entries: &[WalEntry]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.encode()).unwrap();
    }
    file.sync_all().unwrap();
}

fn write_raw(path: &Path, bytes: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, path) = setup_temp_segment();
    File::create(&path).unwrap();

    let reader = WalReader::open(&path).unwrap();

    assert!(reader.read_entry().unwrap().is_none());
    // End of segment stays end of segment
    assert!(reader.read_entry().unwrap().is_none());
}

#[test]
fn test_read_multiple_entries() {
    let (_temp, path) = setup_temp_segment();
    let entries = vec![
        WalEntry::new(1, b"entry1").unwrap(),
        WalEntry::new(2, b"").unwrap(),
        WalEntry::new(3, b"entry3").unwrap(),
    ];
    write_entries(&path, &entries);

    let reader = WalReader::open(&path).unwrap();
    for (i, original) in entries.iter().enumerate() {
        let entry = reader.read_entry().unwrap().unwrap();
        assert_eq!(&entry, original, "Entry {} mismatch", i);
        assert_eq!(entry.timestamp_millis(), original.timestamp_millis());
    }
    assert!(reader.read_entry().unwrap().is_none());
}

#[test]
fn test_open_missing_file_is_io_error() {
    let (_temp, path) = setup_temp_segment();
    let err = WalReader::open(&path).err().unwrap();
    assert!(matches!(err, WalError::Io(_)));
}

#[test]
fn test_reopen_starts_from_beginning() {
    let (_temp, path) = setup_temp_segment();
    write_entries(&path, &[WalEntry::new(1, b"a").unwrap(), WalEntry::new(2, b"b").unwrap()]);

    let first = WalReader::open(&path).unwrap();
    assert_eq!(first.read_entry().unwrap().unwrap().sequence_number(), 1);
    assert_eq!(first.read_entry().unwrap().unwrap().sequence_number(), 2);

    let second = WalReader::open(&path).unwrap();
    assert_eq!(second.read_entry().unwrap().unwrap().sequence_number(), 1);
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_empty_file() {
    let (_temp, path) = setup_temp_segment();
    File::create(&path).unwrap();

    let reader = WalReader::open(&path).unwrap();
    assert_eq!(reader.entries().count(), 0);
}

#[test]
fn test_iterator_multiple_entries() {
    let (_temp, path) = setup_temp_segment();
    let originals: Vec<_> = (0..50).map(|i| WalEntry::new(i, b"payload").unwrap()).collect();
    write_entries(&path, &originals);

    let reader = WalReader::open(&path).unwrap();
    let entries: Vec<_> = reader.entries().collect::<Result<Vec<_>, _>>().unwrap();

    assert_eq!(entries, originals);
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, path) = setup_temp_segment();
    write_entries(&path, &[WalEntry::new(1, b"good").unwrap()]);
    append_raw(&path, &[0, 0]);

    let reader = WalReader::open(&path).unwrap();
    let mut iter = reader.entries();

    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().unwrap().unwrap_err().is_corruption());
    assert!(iter.next().is_none());
}

#[test]
fn test_iterator_continues_shared_cursor() {
    let (_temp, path) = setup_temp_segment();
    let originals: Vec<_> = (0..4).map(|i| WalEntry::new(i, b"p").unwrap()).collect();
    write_entries(&path, &originals);

    let reader = WalReader::open(&path).unwrap();
    reader.read_entry().unwrap().unwrap();

    let rest: Vec<u64> = reader
        .entries()
        .map(|e| e.unwrap().sequence_number())
        .collect();
    assert_eq!(rest, vec![1, 2, 3]);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_length_prefix_without_body() {
    let (_temp, path) = setup_temp_segment();
    write_raw(&path, &100u32.to_be_bytes());

    let reader = WalReader::open(&path).unwrap();
    let err = reader.read_entry().unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_partial_length_prefix() {
    let (_temp, path) = setup_temp_segment();
    write_raw(&path, &[0, 0, 1]);

    let reader = WalReader::open(&path).unwrap();
    assert!(reader.read_entry().unwrap_err().is_corruption());
}

#[test]
fn test_truncated_last_entry() {
    let (_temp, path) = setup_temp_segment();
    let good = WalEntry::new(1, b"complete").unwrap();
    let torn = WalEntry::new(2, b"torn entry").unwrap().encode();

    write_entries(&path, &[good.clone()]);
    append_raw(&path, &torn[..torn.len() - 5]);

    let reader = WalReader::open(&path).unwrap();
    assert_eq!(reader.read_entry().unwrap().unwrap(), good);
    assert!(reader.read_entry().unwrap_err().is_corruption());
}

#[test]
fn test_length_below_minimum() {
    let (_temp, path) = setup_temp_segment();
    let mut bytes = 8u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 8]);
    write_raw(&path, &bytes);

    let reader = WalReader::open(&path).unwrap();
    assert!(reader.read_entry().unwrap_err().is_corruption());
}

#[test]
fn test_declared_payload_length_too_large() {
    let (_temp, path) = setup_temp_segment();
    let mut frame = WalEntry::new(1, b"abc").unwrap().encode().to_vec();
    // PayloadLength lives after prefix(4) + seq(8) + ts(8)
    frame[20..24].copy_from_slice(&500u32.to_be_bytes());
    write_raw(&path, &frame);

    let reader = WalReader::open(&path).unwrap();
    assert!(reader.read_entry().unwrap_err().is_corruption());
}

// =============================================================================
// Checksum Policy Tests
// =============================================================================

#[test]
fn test_verify_rejects_bad_checksum() {
    let (_temp, path) = setup_temp_segment();
    let mut frame = WalEntry::new(1, b"abc").unwrap().encode().to_vec();
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;
    write_raw(&path, &frame);

    let reader = WalReader::open(&path).unwrap();
    assert_eq!(reader.checksum_policy(), ChecksumPolicy::Verify);
    assert!(reader.read_entry().unwrap_err().is_corruption());
}

#[test]
fn test_pass_through_accepts_bad_checksum() {
    let (_temp, path) = setup_temp_segment();
    let original = WalEntry::new(1, b"abc").unwrap();
    let mut frame = original.encode().to_vec();
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;
    write_raw(&path, &frame);

    let reader = WalReader::open_with_policy(&path, ChecksumPolicy::PassThrough).unwrap();
    let entry = reader.read_entry().unwrap().unwrap();
    assert_eq!(entry, original);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_read_after_close_fails() {
    let (_temp, path) = setup_temp_segment();
    write_entries(&path, &[WalEntry::new(1, b"a").unwrap()]);

    let reader = WalReader::open(&path).unwrap();
    reader.close();

    let err = reader.read_entry().unwrap_err();
    assert!(matches!(err, WalError::Closed("reader")));
}

#[test]
fn test_reader_close_is_idempotent() {
    let (_temp, path) = setup_temp_segment();
    File::create(&path).unwrap();

    let reader = WalReader::open(&path).unwrap();
    reader.close();
    reader.close();
    assert!(reader.is_closed());
}
