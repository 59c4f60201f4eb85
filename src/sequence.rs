//! Sequence engine and the packed-children primitives shared with dictionaries
//!
//! Children of a dictionary or sequence are complete items stored back to
//! back. Inserting or removing one shifts every later sibling.

use crate::error::{BrbonError, Result};
use crate::item::check_nesting;
use crate::item_type::ItemType;
use crate::manager::ItemManager;
use crate::name::NameField;
use crate::portal::{Portal, PortalKey};
use crate::value::Value;

impl ItemManager {
    /// Append a named child to a sequence
    pub fn append_named(&mut self, sequence: &Portal, name: &str, value: impl Into<Value>) -> Result<()> {
        let offset = self.container(sequence, ItemType::Sequence)?;
        let count = self.header(offset)?.count_value as usize;
        self.insert_child(offset, count, value.into(), NameField::optional(Some(name))?)?;
        Ok(())
    }

    /// Insert a named child before position `index`
    pub fn insert_named(
        &mut self,
        sequence: &Portal,
        index: usize,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let offset = self.container(sequence, ItemType::Sequence)?;
        self.insert_child(offset, index, value.into(), NameField::optional(Some(name))?)?;
        Ok(())
    }

    /// Replace the value of child `index`, keeping its name
    pub fn update_at(&mut self, sequence: &Portal, index: usize, value: impl Into<Value>) -> Result<()> {
        let offset = self.container(sequence, ItemType::Sequence)?;
        let child = self.child_offset(offset, index)?;
        self.replace_item(child, value.into())
    }

    pub(crate) fn child_offset(&self, container: usize, index: usize) -> Result<usize> {
        let children = self.children(container)?;
        children
            .get(index)
            .copied()
            .ok_or(BrbonError::IndexOutOfBounds {
                index,
                count: children.len(),
            })
    }

    pub(crate) fn child_portal(&self, container: usize, index: usize) -> Result<Portal> {
        Ok(self.portal(PortalKey::item(self.child_offset(container, index)?)))
    }

    /// Write a new child item before position `index`; returns its offset
    pub(crate) fn insert_child(
        &mut self,
        container: usize,
        index: usize,
        value: Value,
        name: Option<NameField>,
    ) -> Result<usize> {
        let count = self.header(container)?.count_value as usize;
        if index > count {
            return Err(BrbonError::IndexOutOfBounds { index, count });
        }
        check_nesting(self.depth_of(container)? + 1, &value)?;
        let bytes = self.encode_value(&value, name.as_ref())?;
        let used = self.used_value_bytes(container)?;
        let container = self.ensure_value_capacity(container, used + bytes.len())?;

        let end = self.value_field(container)? + used;
        let at = if index < count {
            self.child_offset(container, index)?
        } else {
            end
        };
        self.move_block(at + bytes.len(), at, end - at, 0)?;
        self.buffer_mut().write_bytes(at, &bytes)?;
        self.set_count(container, count + 1)?;
        self.relink(container)?;
        Ok(at)
    }

    /// Remove child `index` and close the gap
    pub(crate) fn remove_child(&mut self, container: usize, index: usize) -> Result<()> {
        let count = self.header(container)?.count_value as usize;
        let at = self.child_offset(container, index)?;
        let size = self.header(at)?.item_byte_count as usize;
        let end = self.value_field(container)? + self.used_value_bytes(container)?;

        self.move_block(at, at + size, end - at - size, size)?;
        self.buffer_mut().zero(end - size, size)?;
        self.set_count(container, count - 1)?;
        self.relink(container)
    }
}
