//! Corruption detection on load
//!
//! Each test damages one field of a valid buffer and expects `load` to
//! report `MalformedBuffer` instead of adopting it.

use brbon::{
    ArrayValue, BrbonError, ColumnSpec, ItemManager, ItemType, ManagerConfig, TableValue, Value,
};

fn document() -> Vec<u8> {
    let value = Value::Dictionary(vec![
        ("name".into(), Value::String("warehouse".into())),
        (
            "values".into(),
            Value::Array(ArrayValue::with_elements(
                ItemType::UInt16,
                vec![Value::UInt16(1), Value::UInt16(2)],
            )),
        ),
        (
            "rows".into(),
            Value::Table(TableValue {
                columns: vec![ColumnSpec::new("n", ItemType::Int32)],
                rows: vec![vec![Value::Int32(4)]],
            }),
        ),
    ]);
    ItemManager::with_root(value, None, ManagerConfig::default())
        .unwrap()
        .export()
}

fn assert_malformed(bytes: &[u8]) {
    match ItemManager::load(bytes, ManagerConfig::default()) {
        Err(BrbonError::MalformedBuffer { .. }) => {}
        Err(other) => panic!("expected MalformedBuffer, got {other}"),
        Ok(_) => panic!("corrupted buffer was accepted"),
    }
}

/// Offset of the first byte sequence equal to `needle`
fn find(bytes: &[u8], needle: &[u8]) -> usize {
    bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap()
}

#[test]
fn test_valid_document_loads() {
    let bytes = document();
    let m = ItemManager::load(&bytes, ManagerConfig::default()).unwrap();
    assert_eq!(m.count(&m.root()), Some(3));
}

#[test]
fn test_empty_and_truncated() {
    assert_malformed(&[]);
    let bytes = document();
    assert_malformed(&bytes[..bytes.len() - 8]);
    assert_malformed(&bytes[..12]);
}

#[test]
fn test_illegal_type_tag() {
    let mut bytes = document();
    bytes[0] = 0x00;
    assert_malformed(&bytes);
    bytes[0] = 0x15;
    assert_malformed(&bytes);
}

#[test]
fn test_unaligned_item_byte_count() {
    let mut bytes = document();
    let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    bytes[4..8].copy_from_slice(&(size - 4).to_le_bytes());
    assert_malformed(&bytes);
}

#[test]
fn test_child_count_too_large() {
    let mut bytes = document();
    bytes[12..16].copy_from_slice(&4u32.to_le_bytes());
    assert_malformed(&bytes);
}

#[test]
fn test_corrupted_name_bytes() {
    let mut bytes = document();
    let at = find(&bytes, b"values");
    bytes[at] = b'V';
    assert_malformed(&bytes);
}

#[test]
fn test_corrupted_parent_offset() {
    let mut bytes = document();
    // first child sits right after the root header
    bytes[16 + 8] = 0x08;
    assert_malformed(&bytes);
}

#[test]
fn test_string_length_past_value_field() {
    let mut bytes = document();
    let at = find(&bytes, b"warehouse") - 4;
    bytes[at..at + 4].copy_from_slice(&200u32.to_le_bytes());
    assert_malformed(&bytes);
}

#[test]
fn test_invalid_utf8_string() {
    let mut bytes = document();
    let at = find(&bytes, b"warehouse");
    bytes[at] = 0xFF;
    assert_malformed(&bytes);
}

#[test]
fn test_array_element_type_null() {
    let mut bytes = document();
    // the array's value field follows its 16-byte header and "values" name field
    let name = find(&bytes, b"values");
    let value_field = name - 3 + 16;
    assert_eq!(bytes[value_field], ItemType::UInt16 as u8);
    bytes[value_field] = ItemType::Null as u8;
    assert_malformed(&bytes);
}

#[test]
fn test_table_row_count_too_large() {
    let mut bytes = document();
    let name = find(&bytes, b"rows");
    let value_field = name - 3 + 8;
    assert_eq!(
        u32::from_le_bytes(bytes[value_field..value_field + 4].try_into().unwrap()),
        1
    );
    bytes[value_field..value_field + 4].copy_from_slice(&1000u32.to_le_bytes());
    assert_malformed(&bytes);
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let mut bytes = document();
    let len = bytes.len();
    bytes.extend_from_slice(&[0xAB; 24]);
    let m = ItemManager::load(&bytes, ManagerConfig::default()).unwrap();
    assert_eq!(m.as_bytes().len(), len);
}
