//! Save/load through the filesystem

use brbon::{
    ArrayValue, BrbonError, Endianness, ItemManager, ItemManagerBuilder, ItemType, ManagerConfig,
    Value,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_round_trip_after_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edits.brbon");

    let mut m = ItemManager::new(ManagerConfig::default()).unwrap();
    let root = m.root();
    m.update_value(&root, "samples", ArrayValue::new(ItemType::Float32)).unwrap();
    let samples = m.find_item(&root, "samples").unwrap();
    for i in 0..100 {
        m.append(&samples, i as f32 * 0.5).unwrap();
    }
    m.update_value(&root, "label", "sensor-a").unwrap();
    m.save_to_file(&path).unwrap();

    let loaded = ItemManager::load_from_file(&path, ManagerConfig::default()).unwrap();
    assert_eq!(loaded.value(&loaded.root()), m.value(&root));
    assert_eq!(fs::read(&path).unwrap(), m.export());
}

#[test]
fn test_overwrite_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("twice.brbon");

    let big = ItemManager::with_root(Value::Binary(vec![7; 500]), None, ManagerConfig::default()).unwrap();
    big.save_to_file(&path).unwrap();
    let small = ItemManager::with_root(Value::Bool(true), Some("flag"), ManagerConfig::default()).unwrap();
    small.save_to_file(&path).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 16 + 8);
    let loaded = ItemManager::load_from_file(&path, ManagerConfig::default()).unwrap();
    assert_eq!(loaded.get::<bool>(&loaded.root()), Some(true));
    assert_eq!(loaded.name(&loaded.root()).as_deref(), Some("flag"));
}

#[test]
fn test_endianness_must_match() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.brbon");

    let m = ItemManagerBuilder::new()
        .endianness(Endianness::Big)
        .root(Value::Sequence(vec![(None, Value::UInt64(1))]))
        .build()
        .unwrap();
    m.save_to_file(&path).unwrap();

    let little = ItemManager::load_from_file(&path, ManagerConfig::default());
    assert!(matches!(little, Err(BrbonError::MalformedBuffer { .. })));

    let config = ManagerConfig {
        endianness: Endianness::Big,
        ..ManagerConfig::default()
    };
    let big = ItemManager::load_from_file(&path, config).unwrap();
    let first = big.element(&big.root(), 0).unwrap();
    assert_eq!(big.get::<u64>(&first), Some(1));
}

#[test]
fn test_config_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("brbon.toml");
    fs::write(&config_path, "initial_capacity = 128\ngrowth_increment = 0\n").unwrap();

    let config = ManagerConfig::from_toml_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
    let mut m = ItemManager::new(config).unwrap();
    let root = m.root();
    assert_eq!(m.capacity(), 128);
    let result = m.update_value(&root, "blob", vec![0u8; 256]);
    assert!(matches!(result, Err(BrbonError::InsufficientCapacity { .. })));
}
