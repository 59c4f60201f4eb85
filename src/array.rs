//! Array engine
//!
//! Elements share one type and one stride. Growing an element widens the
//! stride of every element; the stride never shrinks.

use crate::error::{BrbonError, Result};
use crate::item::{check_nesting, encode_element, min_element_byte_count, normalize_slot};
use crate::item_type::ItemType;
use crate::layout::{ARRAY_ELEMENTS_OFFSET, ARRAY_ELEMENT_BYTE_COUNT_OFFSET};
use crate::manager::{ItemManager, Location};
use crate::portal::{Portal, PortalKey};
use crate::value::Value;
use tracing::debug;

impl ItemManager {
    /// Element type of an array
    pub fn element_type(&self, array: &Portal) -> Option<ItemType> {
        let result = self
            .container(array, ItemType::Array)
            .and_then(|offset| self.element_type_at(offset));
        self.lenient(array, result)
    }

    /// Element stride of an array
    pub fn element_byte_count(&self, array: &Portal) -> Option<usize> {
        let result = self
            .container(array, ItemType::Array)
            .and_then(|offset| self.element_stride_at(offset));
        self.lenient(array, result)
    }

    /// Widen the element stride to at least `byte_count`
    ///
    /// Non-scalar strides are rounded up to a multiple of 8. Requests at or
    /// below the current stride leave the array as is.
    ///
    /// # Errors
    ///
    /// `FixedSizeTooSmall` when `byte_count` cannot hold the current elements.
    pub fn set_element_byte_count(&mut self, array: &Portal, byte_count: usize) -> Result<()> {
        let offset = self.container(array, ItemType::Array)?;
        let element_type = self.element_type_at(offset)?;
        let requested = normalize_slot(element_type, byte_count);

        let mut minimum = min_element_byte_count(element_type, None)?;
        for value in self.elements_of(offset)? {
            minimum = minimum.max(min_element_byte_count(element_type, Some(&value))?);
        }
        if requested < minimum {
            return Err(BrbonError::FixedSizeTooSmall { requested, minimum });
        }
        self.restride(offset, requested)?;
        Ok(())
    }

    /// Every element, materialized
    pub fn array_values(&self, array: &Portal) -> Option<Vec<Value>> {
        let result = self
            .container(array, ItemType::Array)
            .and_then(|offset| self.elements_of(offset));
        self.lenient(array, result)
    }

    fn elements_of(&self, array: usize) -> Result<Vec<Value>> {
        let count = self.header(array)?.count_value as usize;
        (0..count)
            .map(|index| self.value_at(Location::Element { array, index }))
            .collect()
    }

    /// Portal for element `index`; container elements get item portals
    pub(crate) fn element_portal(&self, array: usize, index: usize) -> Result<Portal> {
        let count = self.header(array)?.count_value as usize;
        if index >= count {
            return Err(BrbonError::IndexOutOfBounds { index, count });
        }
        if self.element_type_at(array)?.is_container() {
            Ok(self.portal(PortalKey::item(self.element_offset(array, index)?)))
        } else {
            Ok(self.portal(PortalKey::element(array, index)))
        }
    }

    /// Insert `value` before element `index` (`index == count` appends)
    pub(crate) fn insert_element(&mut self, array: usize, index: usize, value: Value) -> Result<()> {
        let count = self.header(array)?.count_value as usize;
        if index > count {
            return Err(BrbonError::IndexOutOfBounds { index, count });
        }
        let element_type = self.element_type_at(array)?;
        let minimum = min_element_byte_count(element_type, Some(&value))?;
        if element_type.is_container() {
            check_nesting(self.depth_of(array)? + 1, &value)?;
        }
        let stride = self
            .element_stride_at(array)?
            .max(normalize_slot(element_type, minimum));
        let bytes = encode_element(&value, element_type, stride, self.endianness())?;

        // all growth happens here, before any byte moves
        let array = self.ensure_value_capacity(array, ARRAY_ELEMENTS_OFFSET + (count + 1) * stride)?;
        let array = self.restride(array, stride)?;

        let start = self.element_offset(array, 0)?;
        if index < count {
            self.move_block(
                start + (index + 1) * stride,
                start + index * stride,
                (count - index) * stride,
                0,
            )?;
            self.portals_mut().shift_indices(array, index, 1);
        }
        self.buffer_mut().write_bytes(start + index * stride, &bytes)?;
        self.set_count(array, count + 1)?;
        if element_type.is_container() {
            self.relink(array)?;
        }
        Ok(())
    }

    /// Remove element `index`, shifting later elements down one stride
    pub(crate) fn remove_element(&mut self, array: usize, index: usize) -> Result<()> {
        let count = self.header(array)?.count_value as usize;
        if index >= count {
            return Err(BrbonError::IndexOutOfBounds { index, count });
        }
        let stride = self.element_stride_at(array)?;
        let start = self.element_offset(array, 0)?;
        let slot = start + index * stride;

        self.move_block(slot, slot + stride, (count - index - 1) * stride, stride)?;
        self.buffer_mut().zero(start + (count - 1) * stride, stride)?;
        self.portals_mut().shift_indices(array, index, -1);
        self.set_count(array, count - 1)?;
        if self.element_type_at(array)?.is_container() {
            self.relink(array)?;
        }
        Ok(())
    }

    /// Overwrite element `index`, widening the stride when the value needs it
    pub(crate) fn set_element(&mut self, array: usize, index: usize, value: Value) -> Result<()> {
        let element_type = self.element_type_at(array)?;
        let minimum = min_element_byte_count(element_type, Some(&value))?;
        if element_type.is_container() {
            let offset = self.element_offset(array, index)?;
            return self.replace_item(offset, value);
        }

        let stride = self
            .element_stride_at(array)?
            .max(normalize_slot(element_type, minimum));
        let bytes = encode_element(&value, element_type, stride, self.endianness())?;
        let array = self.restride(array, stride)?;
        let offset = self.element_offset(array, index)?;
        self.buffer_mut().write_bytes(offset, &bytes)
    }

    /// Give every element of `array` a stride of `new_stride` bytes
    ///
    /// Elements move from the last to the first so no element overwrites one
    /// that has not moved yet. Returns the array's offset afterwards.
    pub(crate) fn restride(&mut self, array: usize, new_stride: usize) -> Result<usize> {
        let stride = self.element_stride_at(array)?;
        if new_stride <= stride {
            return Ok(array);
        }
        let count = self.header(array)?.count_value as usize;
        let array = self.ensure_value_capacity(array, ARRAY_ELEMENTS_OFFSET + count * new_stride)?;
        let is_container = self.element_type_at(array)?.is_container();

        let start = self.element_offset(array, 0)?;
        for index in (0..count).rev() {
            let src = start + index * stride;
            let dst = start + index * new_stride;
            self.move_block(dst, src, stride, 0)?;
            self.buffer_mut().zero(dst + stride, new_stride - stride)?;
            if is_container {
                self.set_item_byte_count(dst, new_stride)?;
            }
        }
        let vf = self.value_field(array)?;
        self.buffer_mut()
            .write::<u32>(vf + ARRAY_ELEMENT_BYTE_COUNT_OFFSET, new_stride as u32)?;
        if is_container {
            self.relink(array)?;
        }
        debug!(
            "Restrided array at {:#x}: {} -> {} bytes per element, {} elements",
            array, stride, new_stride, count
        );
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ManagerConfig;
    use crate::error::BrbonError;
    use crate::item_type::ItemType;
    use crate::manager::ItemManager;
    use crate::value::{ArrayValue, Value};

    fn array_manager(element_type: ItemType) -> ItemManager {
        ItemManager::with_root(ArrayValue::new(element_type), None, ManagerConfig::default()).unwrap()
    }

    #[test]
    fn test_append_and_insert_u32() {
        let mut m = array_manager(ItemType::UInt32);
        let root = m.root();
        for v in [1u32, 2, 3] {
            m.append(&root, v).unwrap();
        }
        assert_eq!(m.count(&root), Some(3));
        assert_eq!(m.element_byte_count(&root), Some(4));

        m.insert(&root, 1, 99u32).unwrap();
        assert_eq!(
            m.array_values(&root).unwrap(),
            vec![Value::UInt32(1), Value::UInt32(99), Value::UInt32(2), Value::UInt32(3)]
        );
    }

    #[test]
    fn test_type_mismatch_leaves_array_alone() {
        let mut m = array_manager(ItemType::UInt32);
        let root = m.root();
        m.append(&root, 1u32).unwrap();
        let before = m.export();
        assert!(matches!(
            m.append(&root, 1i64),
            Err(BrbonError::TypeMismatch { expected: "uint32", found: "int64" })
        ));
        assert_eq!(m.export(), before);
    }

    #[test]
    fn test_remove_shifts_down() {
        let mut m = array_manager(ItemType::Int16);
        let root = m.root();
        for v in [10i16, 20, 30, 40] {
            m.append(&root, v).unwrap();
        }
        let last = m.element(&root, 3).unwrap();
        let removed = m.element(&root, 1).unwrap();

        m.remove(&root, 1).unwrap();
        assert_eq!(m.count(&root), Some(3));
        assert!(!m.is_valid(&removed));
        // the element portal followed its element to index 2
        assert_eq!(m.get::<i16>(&last), Some(40));
        assert!(matches!(
            m.remove(&root, 3),
            Err(BrbonError::IndexOutOfBounds { index: 3, count: 3 })
        ));
    }

    #[test]
    fn test_string_elements_widen_stride() {
        let mut m = array_manager(ItemType::String);
        let root = m.root();
        m.append(&root, "ab").unwrap();
        assert_eq!(m.element_byte_count(&root), Some(8));
        m.append(&root, "a longer string").unwrap();
        assert_eq!(m.element_byte_count(&root), Some(24));

        let first = m.element(&root, 0).unwrap();
        assert_eq!(m.get_string(&first).as_deref(), Some("ab"));

        // never shrinks
        m.remove(&root, 1).unwrap();
        assert_eq!(m.element_byte_count(&root), Some(24));
    }

    #[test]
    fn test_set_element_byte_count() {
        let mut m = array_manager(ItemType::Binary);
        let root = m.root();
        m.append(&root, vec![1u8; 10]).unwrap();
        assert!(matches!(
            m.set_element_byte_count(&root, 8),
            Err(BrbonError::FixedSizeTooSmall { requested: 8, minimum: 16 })
        ));
        m.set_element_byte_count(&root, 30).unwrap();
        assert_eq!(m.element_byte_count(&root), Some(32));
        assert_eq!(m.array_values(&root).unwrap(), vec![Value::Binary(vec![1u8; 10])]);
    }

    #[test]
    fn test_nested_container_elements() {
        let mut m = array_manager(ItemType::Sequence);
        let root = m.root();
        m.append(&root, Value::Sequence(Vec::new())).unwrap();
        m.append(&root, Value::Sequence(Vec::new())).unwrap();
        assert_eq!(m.element_byte_count(&root), Some(16));

        let second = m.element(&root, 1).unwrap();
        m.append(&second, 5u8).unwrap();
        m.append(&second, 6u8).unwrap();

        // the element grew, so every element did
        assert_eq!(m.element_byte_count(&root), Some(48));
        assert_eq!(m.count(&second), Some(2));
        let first = m.element(&root, 0).unwrap();
        assert_eq!(m.count(&first), Some(0));
        assert_eq!(m.item_byte_count(&first), Some(48));
    }

    #[test]
    fn test_scalar_set_through_element_portal() {
        let mut m = array_manager(ItemType::Float64);
        let root = m.root();
        m.append(&root, 1.5f64).unwrap();
        let e = m.element(&root, 0).unwrap();
        m.set(&e, 2.5f64).unwrap();
        assert_eq!(m.get::<f64>(&e), Some(2.5));
        assert!(matches!(m.set(&e, 1u8), Err(BrbonError::TypeMismatch { .. })));
    }
}
