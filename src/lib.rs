//! # BRBON - In-Place Mutable Binary Items
//!
//! `brbon` stores a tree of typed items in one contiguous byte buffer and
//! edits it in place. Every item is self-describing:
//!
//! - **16-byte header** with type, name size, item size, parent offset and a
//!   count/value slot that holds small scalars directly
//! - **Optional hashed names** for keyed lookup in dictionaries and sequences
//! - **Containers**: fixed-stride arrays, dictionaries, ordered sequences and
//!   column-typed tables
//! - **Portals**: handles that stay valid while the bytes they point at move
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brbon::{ItemManager, ManagerConfig, Result};
//!
//! # fn main() -> Result<()> {
//! // The root is an empty dictionary
//! let mut manager = ItemManager::new(ManagerConfig::default())?;
//! let root = manager.root();
//!
//! manager.update_value(&root, "x", 5i32)?;
//! manager.update_value(&root, "y", "hi")?;
//! manager.remove_value(&root, "x")?;
//!
//! let y = manager.find_item(&root, "y").expect("y is present");
//! assert_eq!(manager.get_string(&y).as_deref(), Some("hi"));
//!
//! // Bytes are the wire format; load validates them
//! let bytes = manager.export();
//! let copy = ItemManager::load(&bytes, ManagerConfig::default())?;
//! assert_eq!(copy.count(&copy.root()), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Tables
//!
//! ```rust,no_run
//! use brbon::{ColumnSpec, ItemManager, ItemType, ManagerConfig, Result, TableValue};
//!
//! # fn main() -> Result<()> {
//! let table = TableValue::new(vec![
//!     ColumnSpec::new("id", ItemType::UInt32),
//!     ColumnSpec::new("name", ItemType::String).with_byte_count(32),
//! ]);
//! let mut manager = ItemManager::with_root(table, None, ManagerConfig::default())?;
//! let root = manager.root();
//!
//! manager.add_rows(&root, 2)?;
//! let id = manager.cell_by_name(&root, 0, "id")?;
//! manager.set(&id, 7u32)?;
//! manager.add_column(&root, ColumnSpec::new("flag", ItemType::Bool))?;
//!
//! assert_eq!(manager.get::<u32>(&id), Some(7));
//! # Ok(())
//! # }
//! ```

pub mod array;
pub(crate) mod buffer;
pub mod codec;
pub mod config;
pub mod crc;
pub mod dictionary;
pub mod error;
pub mod io;
pub mod item;
pub mod item_type;
pub mod layout;
pub mod manager;
pub mod name;
pub mod portal;
pub mod sequence;
pub mod table;
pub mod validate;
pub mod value;

pub use crate::codec::{Codec, Endianness};
pub use crate::config::{ItemManagerBuilder, ManagerConfig, DEFAULT_CAPACITY};
pub use crate::error::{BrbonError, Result};
pub use crate::item_type::ItemType;
pub use crate::manager::ItemManager;
pub use crate::name::{NameField, MAX_NAME_BYTES};
pub use crate::portal::{Portal, PortalKey};
pub use crate::value::{ArrayValue, ColumnSpec, Scalar, TableValue, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_scenario() {
        let mut manager =
            ItemManager::with_root(ArrayValue::new(ItemType::UInt32), None, ManagerConfig::fixed(256)).unwrap();
        let root = manager.root();
        for v in [1u32, 2, 3] {
            manager.append(&root, v).unwrap();
        }
        assert_eq!(manager.count(&root), Some(3));
        assert_eq!(manager.element_byte_count(&root), Some(4));

        manager.insert(&root, 1, 99u32).unwrap();
        assert_eq!(
            manager.array_values(&root).unwrap(),
            vec![Value::UInt32(1), Value::UInt32(99), Value::UInt32(2), Value::UInt32(3)]
        );
    }

    #[test]
    fn test_reexports_cover_public_surface() {
        let builder = ItemManagerBuilder::new().strict(false);
        let manager = builder.build().unwrap();
        assert_eq!(manager.item_type(&manager.root()), Some(ItemType::Dictionary));
        assert!(NameField::new("n".repeat(MAX_NAME_BYTES)).is_ok());
        assert_eq!(manager.capacity(), DEFAULT_CAPACITY);
    }
}
