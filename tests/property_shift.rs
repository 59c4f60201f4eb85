//! Property-based tests for shifting containers
//!
//! Uses proptest to check that inserts and removes behave like the same
//! operations on a `Vec`, and that buffers stay loadable throughout.

use brbon::{ArrayValue, ColumnSpec, ItemManager, ItemType, ManagerConfig, TableValue, Value};
use proptest::prelude::*;

fn small_config() -> ManagerConfig {
    ManagerConfig {
        initial_capacity: 32,
        growth_increment: 32,
        ..ManagerConfig::default()
    }
}

proptest! {
    #[test]
    fn prop_array_matches_vec(
        initial in prop::collection::vec(any::<i32>(), 0..20),
        ops in prop::collection::vec((any::<bool>(), any::<usize>(), any::<i32>()), 0..30)
    ) {
        let mut m = ItemManager::with_root(ArrayValue::new(ItemType::Int32), None, small_config()).unwrap();
        let root = m.root();
        let mut model = Vec::new();
        for v in initial {
            m.append(&root, v).unwrap();
            model.push(v);
        }

        for (insert, at, v) in ops {
            if insert {
                let at = at % (model.len() + 1);
                m.insert(&root, at, v).unwrap();
                model.insert(at, v);
            } else if !model.is_empty() {
                let at = at % model.len();
                m.remove(&root, at).unwrap();
                model.remove(at);
            }
        }

        let expected: Vec<Value> = model.into_iter().map(Value::Int32).collect();
        prop_assert_eq!(m.array_values(&root).unwrap(), expected);
        prop_assert!(ItemManager::load(&m.export(), ManagerConfig::default()).is_ok());
    }

    #[test]
    fn prop_untouched_element_portals_follow(
        count in 2usize..16,
        target in any::<usize>(),
        insert in any::<bool>()
    ) {
        let mut m = ItemManager::with_root(ArrayValue::new(ItemType::UInt64), None, small_config()).unwrap();
        let root = m.root();
        for i in 0..count as u64 {
            m.append(&root, i * 10).unwrap();
        }
        let portals: Vec<_> = (0..count).map(|i| m.element(&root, i).unwrap()).collect();
        let target = target % count;

        if insert {
            m.insert(&root, target, u64::MAX).unwrap();
        } else {
            m.remove(&root, target).unwrap();
        }

        for (i, portal) in portals.iter().enumerate() {
            if !insert && i == target {
                prop_assert!(!m.is_valid(portal));
            } else {
                prop_assert_eq!(m.get::<u64>(portal), Some(i as u64 * 10));
            }
        }
    }

    #[test]
    fn prop_sequence_strings_match_vec(
        values in prop::collection::vec("[a-z]{0,40}", 1..12),
        removals in prop::collection::vec(any::<usize>(), 0..6)
    ) {
        let mut m = ItemManager::with_root(Value::Sequence(Vec::new()), None, small_config()).unwrap();
        let root = m.root();
        let mut model = values.clone();
        for v in &values {
            m.append(&root, v.as_str()).unwrap();
        }
        for r in removals {
            if model.is_empty() {
                break;
            }
            let at = r % model.len();
            m.remove(&root, at).unwrap();
            model.remove(at);
        }

        prop_assert_eq!(m.count(&root), Some(model.len()));
        for (i, expected) in model.iter().enumerate() {
            let element = m.element(&root, i).unwrap();
            prop_assert_eq!(m.get_string(&element), Some(expected.clone()));
        }
    }

    #[test]
    fn prop_column_round_trip(
        rows in prop::collection::vec((any::<u16>(), "[a-z]{0,12}"), 0..8),
        position_type in 0usize..4
    ) {
        let table = TableValue {
            columns: vec![
                ColumnSpec::new("k", ItemType::UInt16),
                ColumnSpec::new("s", ItemType::String).with_byte_count(16),
            ],
            rows: rows
                .iter()
                .map(|(k, s)| vec![Value::UInt16(*k), Value::String(s.clone())])
                .collect(),
        };
        let mut m = ItemManager::with_root(table, None, small_config()).unwrap();
        let root = m.root();
        let original = m.value(&root).unwrap();

        let item_type = [ItemType::Bool, ItemType::Int64, ItemType::Binary, ItemType::Sequence][position_type];
        m.add_column(&root, ColumnSpec::new("extra", item_type)).unwrap();
        m.remove_column(&root, "extra").unwrap();
        prop_assert_eq!(m.value(&root).unwrap(), original);
    }
}
