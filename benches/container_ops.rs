use brbon::{ArrayValue, ColumnSpec, ItemManager, ItemType, ManagerConfig, TableValue, Value};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_array_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_append");

    for count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("uint32", count), &count, |b, &count| {
            b.iter(|| {
                let mut m =
                    ItemManager::with_root(ArrayValue::new(ItemType::UInt32), None, ManagerConfig::default())
                        .unwrap();
                let root = m.root();
                for i in 0..count as u32 {
                    m.append(&root, i).unwrap();
                }
                black_box(m.count(&root));
            });
        });
    }
    group.finish();
}

fn bench_array_insert_front(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_insert_front");

    for count in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("uint64", count), &count, |b, &count| {
            b.iter(|| {
                let mut m =
                    ItemManager::with_root(ArrayValue::new(ItemType::UInt64), None, ManagerConfig::default())
                        .unwrap();
                let root = m.root();
                for i in 0..count as u64 {
                    m.insert(&root, 0, i).unwrap();
                }
                black_box(m.count(&root));
            });
        });
    }
    group.finish();
}

fn bench_dictionary(c: &mut Criterion) {
    let mut group = c.benchmark_group("dictionary");

    let mut m = ItemManager::new(ManagerConfig::default()).unwrap();
    let root = m.root();
    for i in 0..500 {
        m.update_value(&root, &format!("key{i}"), i as u32).unwrap();
    }

    let mut rng = StdRng::seed_from_u64(7);
    group.bench_function("find_item_random_of_500", |b| {
        b.iter(|| {
            let key = format!("key{}", rng.gen_range(0..500));
            let portal = m.find_item(&root, &key).unwrap();
            black_box(m.get::<u32>(&portal));
            m.release(portal);
        });
    });

    group.bench_function("update_grows_middle", |b| {
        b.iter(|| {
            let mut m = ItemManager::new(ManagerConfig::default()).unwrap();
            let root = m.root();
            for i in 0..50 {
                m.update_value(&root, &format!("key{i}"), 0u8).unwrap();
            }
            m.update_value(&root, "key25", Value::Binary(vec![0xAB; 4096])).unwrap();
        });
    });
    group.finish();
}

fn bench_table_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("table");

    group.bench_function("add_remove_column_1000_rows", |b| {
        let table = TableValue::new(vec![
            ColumnSpec::new("id", ItemType::UInt32),
            ColumnSpec::new("name", ItemType::String).with_byte_count(24),
        ]);
        let mut m = ItemManager::with_root(table, None, ManagerConfig::default()).unwrap();
        let root = m.root();
        m.add_rows(&root, 1_000).unwrap();

        b.iter(|| {
            m.add_column(&root, ColumnSpec::new("flag", ItemType::Bool)).unwrap();
            m.remove_column(&root, "flag").unwrap();
        });
    });
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut m = ItemManager::new(ManagerConfig::default()).unwrap();
    let root = m.root();
    for i in 0..1_000 {
        m.update_value(&root, &format!("entry{i}"), format!("value {i}")).unwrap();
    }
    let bytes = m.export();

    c.bench_function("load_validate_1000_entries", |b| {
        b.iter(|| ItemManager::load(black_box(&bytes), ManagerConfig::default()).unwrap());
    });
}

criterion_group!(
    benches,
    bench_array_append,
    bench_array_insert_front,
    bench_dictionary,
    bench_table_columns,
    bench_load
);
criterion_main!(benches);
