//! Dictionary engine and name lookup
//!
//! Lookup compares the 16-bit name hash first and the UTF-8 bytes only on a
//! hash hit. Dictionaries hold at most one child per name; sequences may hold
//! several and lookups there return the first.

use crate::error::{BrbonError, Result};
use crate::item_type::ItemType;
use crate::layout::ITEM_NAME_FIELD_OFFSET;
use crate::manager::{ItemManager, Location};
use crate::name::{decode_name, NameField};
use crate::portal::{Portal, PortalKey};
use crate::value::Value;
use tracing::debug;

impl ItemManager {
    /// Replace the child called `name`, or append it when absent
    pub fn update_value(&mut self, dictionary: &Portal, name: &str, value: impl Into<Value>) -> Result<()> {
        let offset = self.container(dictionary, ItemType::Dictionary)?;
        let field = NameField::new(name)?;
        let value = value.into();
        match self.find_child(offset, &field)? {
            Some((_, child)) => self.replace_item(child, value),
            None => {
                let count = self.header(offset)?.count_value as usize;
                self.insert_child(offset, count, value, Some(field))?;
                Ok(())
            }
        }
    }

    /// Portal for the first child called `name` in a dictionary or sequence
    pub fn find_item(&self, container: &Portal, name: &str) -> Option<Portal> {
        let result = self.named_container(container).and_then(|offset| {
            let field = NameField::new(name)?;
            self.find_child(offset, &field)
        });
        let (_, child) = self.lenient(container, result)??;
        Some(self.portal(PortalKey::item(child)))
    }

    /// Remove the first child called `name`; `false` when there is none
    pub fn remove_value(&mut self, container: &Portal, name: &str) -> Result<bool> {
        let offset = self.named_container(container)?;
        let field = NameField::new(name)?;
        match self.find_child(offset, &field)? {
            Some((index, _)) => {
                self.remove_child(offset, index)?;
                debug!("Removed '{}' from container at {:#x}", name, offset);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Names of a dictionary's children in storage order
    pub fn dictionary_names(&self, dictionary: &Portal) -> Option<Vec<String>> {
        let result = self
            .container(dictionary, ItemType::Dictionary)
            .and_then(|offset| self.child_names(offset));
        self.lenient(dictionary, result)
    }

    fn child_names(&self, container: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for child in self.children(container)? {
            let header = self.header(child)?;
            if header.name_field_byte_count > 0 {
                let start = child + ITEM_NAME_FIELD_OFFSET;
                let field = &self.bytes()[start..start + header.name_field_byte_count as usize];
                names.push(decode_name(field, start)?);
            }
        }
        Ok(names)
    }

    fn named_container(&self, portal: &Portal) -> Result<usize> {
        match self.locate(portal)? {
            Location::Item(offset) => {
                let found = self.header(offset)?.item_type;
                if matches!(found, ItemType::Dictionary | ItemType::Sequence) {
                    Ok(offset)
                } else {
                    Err(BrbonError::TypeMismatch {
                        expected: "dictionary or sequence",
                        found: found.name(),
                    })
                }
            }
            _ => Err(BrbonError::TypeMismatch {
                expected: "dictionary or sequence",
                found: "element",
            }),
        }
    }

    /// Index and offset of the first child whose name field matches `name`
    pub(crate) fn find_child(&self, container: usize, name: &NameField) -> Result<Option<(usize, usize)>> {
        let endianness = self.endianness();
        for (index, child) in self.children(container)?.into_iter().enumerate() {
            let header = self.header(child)?;
            if header.name_field_byte_count == 0 {
                continue;
            }
            let start = child + ITEM_NAME_FIELD_OFFSET;
            let field = &self.bytes()[start..start + header.name_field_byte_count as usize];
            if name.matches(field, endianness) {
                return Ok(Some((index, child)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ManagerConfig;
    use crate::error::BrbonError;
    use crate::manager::ItemManager;
    use crate::value::Value;

    fn dictionary_manager() -> ItemManager {
        ItemManager::new(ManagerConfig::default()).unwrap()
    }

    #[test]
    fn test_update_and_remove() {
        let mut m = dictionary_manager();
        let root = m.root();
        m.update_value(&root, "x", 5i32).unwrap();
        m.update_value(&root, "y", "hi").unwrap();
        assert!(m.remove_value(&root, "x").unwrap());

        assert_eq!(m.count(&root), Some(1));
        let y = m.find_item(&root, "y").unwrap();
        assert_eq!(m.get_string(&y).as_deref(), Some("hi"));
        assert!(!m.remove_value(&root, "x").unwrap());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut m = dictionary_manager();
        let root = m.root();
        m.update_value(&root, "a", 1u8).unwrap();
        m.update_value(&root, "b", 2u8).unwrap();
        let b = m.find_item(&root, "b").unwrap();

        m.update_value(&root, "a", "grown into a string value").unwrap();
        assert_eq!(m.count(&root), Some(2));
        assert_eq!(m.dictionary_names(&root).unwrap(), vec!["a", "b"]);
        // b moved behind the grown item and its portal followed
        assert_eq!(m.get::<u8>(&b), Some(2));
    }

    #[test]
    fn test_append_requires_names() {
        let mut m = dictionary_manager();
        let root = m.root();
        assert!(matches!(m.append(&root, 1u8), Err(BrbonError::TypeMismatch { .. })));
        assert!(matches!(m.update_value(&root, "", 1u8), Err(BrbonError::InvalidName(_))));
        assert!(matches!(
            m.update_value(&root, &"n".repeat(246), 1u8),
            Err(BrbonError::NameTooLong(246))
        ));
    }

    #[test]
    fn test_nested_dictionaries_grow() {
        let mut m = dictionary_manager();
        let root = m.root();
        m.update_value(&root, "inner", Value::Dictionary(Vec::new())).unwrap();
        m.update_value(&root, "after", 7u64).unwrap();

        let inner = m.find_item(&root, "inner").unwrap();
        for i in 0..20u32 {
            m.update_value(&inner, &format!("k{i}"), i).unwrap();
        }
        assert_eq!(m.count(&inner), Some(20));
        let after = m.find_item(&root, "after").unwrap();
        assert_eq!(m.get::<u64>(&after), Some(7));
        let k13 = m.find_item(&inner, "k13").unwrap();
        assert_eq!(m.get::<u32>(&k13), Some(13));
    }

    #[test]
    fn test_removed_portal_goes_stale() {
        let mut m = dictionary_manager();
        let root = m.root();
        m.update_value(&root, "gone", Value::Dictionary(vec![("deep".into(), Value::Bool(true))]))
            .unwrap();
        let gone = m.find_item(&root, "gone").unwrap();
        let deep = m.find_item(&gone, "deep").unwrap();

        m.remove_value(&root, "gone").unwrap();
        assert!(!m.is_valid(&gone));
        assert!(!m.is_valid(&deep));
        assert_eq!(m.get::<bool>(&deep), None);
    }
}
