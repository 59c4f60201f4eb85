//! Nesting limits shared by the writer and the loader
//!
//! Anything the API lets a caller build must load again, so edits that
//! would nest deeper than `load` accepts are refused up front.

use brbon::validate::MAX_NESTING_DEPTH;
use brbon::{BrbonError, ColumnSpec, ItemManager, ItemType, ManagerConfig, Portal, TableValue, Value};

/// Sequence chain `levels` deep, ending in an empty sequence
fn chain(levels: usize) -> Value {
    let mut value = Value::Sequence(Vec::new());
    for _ in 0..levels {
        value = Value::Sequence(vec![(None, value)]);
    }
    value
}

/// Portal for the innermost sequence of a chain root
fn innermost(m: &ItemManager, levels: usize) -> Portal {
    let mut portal = m.root();
    for _ in 0..levels {
        portal = m.element(&portal, 0).unwrap();
    }
    portal
}

fn assert_too_deep<T>(result: brbon::Result<T>) {
    match result {
        Err(BrbonError::NestingTooDeep { max, .. }) => assert_eq!(max, MAX_NESTING_DEPTH),
        Err(other) => panic!("expected NestingTooDeep, got {other}"),
        Ok(_) => panic!("nesting past the load limit was accepted"),
    }
}

#[test]
fn test_deepest_loadable_chain_round_trips() {
    let value = chain(MAX_NESTING_DEPTH);
    let m = ItemManager::with_root(value.clone(), None, ManagerConfig::default()).unwrap();
    let copy = ItemManager::load(&m.export(), ManagerConfig::default()).unwrap();
    assert_eq!(copy.value(&copy.root()), Some(value));
}

#[test]
fn test_root_too_deep_is_refused() {
    assert_too_deep(ItemManager::with_root(
        chain(MAX_NESTING_DEPTH + 1),
        None,
        ManagerConfig::default(),
    ));
    assert_too_deep(ItemManager::with_root(chain(140), None, ManagerConfig::default()));
}

#[test]
fn test_append_at_limit_leaves_buffer_loadable() {
    let mut m =
        ItemManager::with_root(chain(MAX_NESTING_DEPTH - 1), None, ManagerConfig::default()).unwrap();
    let inner = innermost(&m, MAX_NESTING_DEPTH - 1);

    // lands exactly at the limit
    m.append(&inner, Value::Sequence(Vec::new())).unwrap();
    let last = m.element(&inner, 0).unwrap();

    let before = m.export();
    assert_too_deep(m.append(&last, Value::Sequence(Vec::new())));
    assert_too_deep(m.insert(&inner, 0, chain(1)));
    assert_eq!(m.export(), before);

    // a sibling of `last` sits at the same depth
    m.append(&inner, Value::UInt8(1)).unwrap();
    assert_too_deep(m.append(&last, Value::UInt8(1)));
    ItemManager::load(&m.export(), ManagerConfig::default()).unwrap();
}

#[test]
fn test_dictionary_update_counts_position() {
    let mut m = ItemManager::new(ManagerConfig::default()).unwrap();
    let root = m.root();

    assert_too_deep(m.update_value(&root, "deep", chain(MAX_NESTING_DEPTH)));
    assert_eq!(m.count(&root), Some(0));

    m.update_value(&root, "deep", chain(MAX_NESTING_DEPTH - 1)).unwrap();
    // replacing keeps the position, so the same limit applies
    assert_too_deep(m.update_value(&root, "deep", chain(MAX_NESTING_DEPTH)));

    let copy = ItemManager::load(&m.export(), ManagerConfig::default()).unwrap();
    let deep = copy.find_item(&copy.root(), "deep").unwrap();
    assert_eq!(copy.value(&deep), Some(chain(MAX_NESTING_DEPTH - 1)));
}

#[test]
fn test_container_columns_count_a_level() {
    let mut m =
        ItemManager::with_root(chain(MAX_NESTING_DEPTH - 1), None, ManagerConfig::default()).unwrap();
    let inner = innermost(&m, MAX_NESTING_DEPTH - 1);

    let nested = TableValue::new(vec![ColumnSpec::new("d", ItemType::Dictionary)]);
    assert_too_deep(m.append(&inner, Value::Table(nested)));

    let flat = TableValue::new(vec![ColumnSpec::new("n", ItemType::Int32)]);
    m.append(&inner, Value::Table(flat)).unwrap();
    let table = m.element(&inner, 0).unwrap();
    assert_too_deep(m.add_column(&table, ColumnSpec::new("d", ItemType::Dictionary)));

    m.add_rows(&table, 2).unwrap();
    ItemManager::load(&m.export(), ManagerConfig::default()).unwrap();
}
