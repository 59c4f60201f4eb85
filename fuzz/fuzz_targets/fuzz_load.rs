#![no_main]
use brbon::{Endianness, ItemManager, ManagerConfig};
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must either be rejected or load into a fully readable tree
fuzz_target!(|data: &[u8]| {
    for endianness in [Endianness::Little, Endianness::Big] {
        let config = ManagerConfig {
            endianness,
            initial_capacity: 0,
            ..ManagerConfig::default()
        };
        if let Ok(manager) = ItemManager::load(data, config) {
            let root = manager.root();
            assert!(manager.value(&root).is_some());
            assert_eq!(manager.as_bytes(), &data[..manager.as_bytes().len()]);
        }
    }
});
