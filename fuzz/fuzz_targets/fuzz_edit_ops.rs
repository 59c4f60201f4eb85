#![no_main]
use arbitrary::Arbitrary;
use brbon::{ItemManager, ManagerConfig, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Update { key: u8, value: u32 },
    UpdateText { key: u8, text: String },
    Remove { key: u8 },
    Nest { key: u8 },
}

// Any sequence of edits must leave a buffer that loads back unchanged
fuzz_target!(|ops: Vec<Op>| {
    let config = ManagerConfig {
        initial_capacity: 64,
        growth_increment: 64,
        ..ManagerConfig::default()
    };
    let Ok(mut manager) = ItemManager::new(config) else {
        return;
    };
    let root = manager.root();
    for op in ops.into_iter().take(64) {
        let _ = match op {
            Op::Update { key, value } => manager.update_value(&root, &format!("k{key}"), value),
            Op::UpdateText { key, text } => manager.update_value(&root, &format!("k{key}"), text),
            Op::Remove { key } => manager.remove_value(&root, &format!("k{key}")).map(|_| ()),
            Op::Nest { key } => {
                manager.update_value(&root, &format!("k{key}"), Value::Sequence(Vec::new()))
            }
        };
    }

    let bytes = manager.export();
    let copy = ItemManager::load(&bytes, ManagerConfig::default()).expect("edited buffer is valid");
    assert_eq!(copy.value(&copy.root()), manager.value(&root));
});
