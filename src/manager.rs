//! The item manager: buffer owner, portal issuer and resize engine
//!
//! Every structural edit funnels through [`ItemManager::move_block`], which
//! moves bytes and updates the portal registry in one step. Growth is
//! recursive: an item that needs more room first grows its parent (and so on
//! up to the root and the buffer itself) before any byte is shifted, so a
//! failed growth leaves the buffer untouched.

use crate::buffer::Buffer;
use crate::codec::Endianness;
use crate::config::ManagerConfig;
use crate::error::{BrbonError, Result};
use crate::item::{
    check_nesting, child_offsets, decode_element, decode_item, encode_item, item_byte_count,
};
use crate::item_type::ItemType;
use crate::layout::{
    round_up8, ItemHeader, ARRAY_ELEMENTS_OFFSET, ARRAY_ELEMENT_BYTE_COUNT_OFFSET,
    ARRAY_ELEMENT_TYPE_OFFSET, ITEM_BYTE_COUNT_OFFSET, ITEM_COUNT_VALUE_OFFSET,
    ITEM_NAME_FIELD_OFFSET, ITEM_PARENT_OFFSET_OFFSET,
};
use crate::name::{decode_name, NameField};
use crate::portal::{Portal, PortalKey, PortalRegistry};
use crate::table::TableSpecification;
use crate::validate::validate_buffer;
use crate::value::{Scalar, Value};
use std::cell::RefCell;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Resolved target of a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    Item(usize),
    Element { array: usize, index: usize },
    Cell { table: usize, row: usize, column: usize },
}

/// Owner of a BRBON buffer
///
/// All access goes through [`Portal`]s obtained from this manager. The
/// manager is `!Sync`: a single owner drives every mutation.
pub struct ItemManager {
    buffer: Buffer,
    portals: RefCell<PortalRegistry>,
    strict: bool,
}

impl fmt::Debug for ItemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemManager")
            .field("capacity", &self.buffer.len())
            .field("root_byte_count", &self.root_byte_count())
            .field("portals", &self.portal_count())
            .field("strict", &self.strict)
            .finish()
    }
}

impl ItemManager {
    /// Manager with an empty, unnamed dictionary as root
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_root(Value::Dictionary(Vec::new()), None, config)
    }

    /// Manager whose root item holds `value`
    ///
    /// # Errors
    ///
    /// Any sizing error of `value`, or `InsufficientCapacity` when the root
    /// does not fit a fixed-capacity buffer.
    pub fn with_root(value: impl Into<Value>, name: Option<&str>, config: ManagerConfig) -> Result<Self> {
        let value = value.into();
        check_nesting(0, &value)?;
        let name = NameField::optional(name)?;
        let bytes = encode_item(&value, name.as_ref(), 0, config.endianness)?;

        let mut buffer = Buffer::allocate(
            config.initial_capacity,
            config.growth_increment,
            config.endianness,
        );
        buffer.grow_to(bytes.len())?;
        buffer.write_bytes(0, &bytes)?;

        let mut manager = ItemManager {
            buffer,
            portals: RefCell::new(PortalRegistry::new()),
            strict: config.strict,
        };
        manager.relink(0)?;
        debug!(
            "Created {} root of {} bytes in a {} byte buffer",
            value.item_type(),
            bytes.len(),
            manager.buffer.len()
        );
        Ok(manager)
    }

    /// Adopt a previously exported buffer after validating it
    ///
    /// # Errors
    ///
    /// `MalformedBuffer` describing the first structural violation found.
    pub fn load(bytes: &[u8], config: ManagerConfig) -> Result<Self> {
        let root_byte_count = validate_buffer(bytes, config.endianness)?;
        let mut data = bytes[..root_byte_count].to_vec();
        data.resize(root_byte_count.max(config.initial_capacity), 0);
        let buffer = Buffer::from_bytes(data, config.growth_increment, config.endianness);
        info!(
            "Loaded buffer: {} byte root, {} bytes capacity",
            root_byte_count,
            buffer.len()
        );
        Ok(ItemManager {
            buffer,
            portals: RefCell::new(PortalRegistry::new()),
            strict: config.strict,
        })
    }

    /// The root item's bytes, ready to persist
    pub fn export(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Borrow the root item's bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.as_slice()[..self.root_byte_count()]
    }

    pub fn endianness(&self) -> Endianness {
        self.buffer.endianness()
    }

    /// Allocated bytes
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Headroom left behind the root item
    pub fn unused_bytes(&self) -> usize {
        self.buffer.len() - self.root_byte_count()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn root_byte_count(&self) -> usize {
        self.buffer
            .read::<u32>(ITEM_BYTE_COUNT_OFFSET)
            .map_or(0, |n| n as usize)
    }

    // --- portals ---

    /// Portal for the root item
    pub fn root(&self) -> Portal {
        self.portal(PortalKey::item(0))
    }

    pub(crate) fn portal(&self, key: PortalKey) -> Portal {
        self.portals.borrow_mut().get(key)
    }

    /// Another counted reference to the location of `portal`
    pub fn retain(&self, portal: &Portal) -> Option<Portal> {
        self.portals.borrow_mut().retain(portal)
    }

    /// Hand back one reference
    pub fn release(&self, portal: Portal) {
        self.portals.borrow_mut().release(portal);
    }

    pub fn is_valid(&self, portal: &Portal) -> bool {
        self.portals.borrow().is_valid(portal)
    }

    /// Current buffer location of `portal`, `None` once it is stale
    pub fn portal_key(&self, portal: &Portal) -> Option<PortalKey> {
        self.portals.borrow().key(portal)
    }

    /// Number of live portals
    pub fn portal_count(&self) -> usize {
        self.portals.borrow().len()
    }

    /// Resolve a portal, checking that its element or cell still exists
    pub(crate) fn locate(&self, portal: &Portal) -> Result<Location> {
        let key = self
            .portals
            .borrow()
            .key(portal)
            .ok_or(BrbonError::InvalidHandle)?;
        match (key.index, key.column) {
            (None, _) => {
                self.header(key.item_offset)?;
                Ok(Location::Item(key.item_offset))
            }
            (Some(index), None) => {
                let header = self.expect_type(key.item_offset, ItemType::Array)?;
                let count = header.count_value as usize;
                if index >= count {
                    return Err(BrbonError::IndexOutOfBounds { index, count });
                }
                Ok(Location::Element {
                    array: key.item_offset,
                    index,
                })
            }
            (Some(row), Some(column)) => {
                let (spec, rows) = self.table_specification(key.item_offset)?;
                if row >= rows {
                    return Err(BrbonError::IndexOutOfBounds { index: row, count: rows });
                }
                if column >= spec.columns.len() {
                    return Err(BrbonError::IndexOutOfBounds {
                        index: column,
                        count: spec.columns.len(),
                    });
                }
                Ok(Location::Cell {
                    table: key.item_offset,
                    row,
                    column,
                })
            }
        }
    }

    /// Offset of the item behind `portal`, which must have type `expected`
    pub(crate) fn container(&self, portal: &Portal, expected: ItemType) -> Result<usize> {
        match self.locate(portal)? {
            Location::Item(offset) => {
                self.expect_type(offset, expected)?;
                Ok(offset)
            }
            Location::Element { array, .. } => Err(BrbonError::TypeMismatch {
                expected: expected.name(),
                found: self.element_type_at(array)?.name(),
            }),
            Location::Cell { table, column, .. } => {
                let (spec, _) = self.table_specification(table)?;
                Err(BrbonError::TypeMismatch {
                    expected: expected.name(),
                    found: spec.columns[column].value_type.name(),
                })
            }
        }
    }

    // --- raw access ---

    pub(crate) fn bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub(crate) fn header(&self, offset: usize) -> Result<ItemHeader> {
        self.buffer.header(offset)
    }

    /// Depth of the item at `offset`; the root is at depth 0
    pub(crate) fn depth_of(&self, mut offset: usize) -> Result<usize> {
        let mut depth = 0;
        while offset != 0 {
            let parent = self.header(offset)?.parent_offset as usize;
            if parent >= offset {
                return Err(BrbonError::malformed(offset, "parent does not precede its child"));
            }
            offset = parent;
            depth += 1;
        }
        Ok(depth)
    }

    pub(crate) fn expect_type(&self, offset: usize, expected: ItemType) -> Result<ItemHeader> {
        let header = self.header(offset)?;
        if header.item_type != expected {
            return Err(BrbonError::TypeMismatch {
                expected: expected.name(),
                found: header.item_type.name(),
            });
        }
        Ok(header)
    }

    pub(crate) fn value_field(&self, offset: usize) -> Result<usize> {
        Ok(offset + self.header(offset)?.value_field_offset())
    }

    pub(crate) fn set_count(&mut self, offset: usize, count: usize) -> Result<()> {
        self.buffer
            .write::<u32>(offset + ITEM_COUNT_VALUE_OFFSET, count as u32)
    }

    pub(crate) fn set_item_byte_count(&mut self, offset: usize, byte_count: usize) -> Result<()> {
        self.buffer
            .write::<u32>(offset + ITEM_BYTE_COUNT_OFFSET, byte_count as u32)
    }

    pub(crate) fn element_type_at(&self, array: usize) -> Result<ItemType> {
        let vf = self.value_field(array)?;
        ItemType::parse(
            self.buffer.read::<u8>(vf + ARRAY_ELEMENT_TYPE_OFFSET)?,
            vf + ARRAY_ELEMENT_TYPE_OFFSET,
        )
    }

    pub(crate) fn element_stride_at(&self, array: usize) -> Result<usize> {
        let vf = self.value_field(array)?;
        Ok(self.buffer.read::<u32>(vf + ARRAY_ELEMENT_BYTE_COUNT_OFFSET)? as usize)
    }

    /// Absolute offset of element `index`
    pub(crate) fn element_offset(&self, array: usize, index: usize) -> Result<usize> {
        Ok(self.value_field(array)? + ARRAY_ELEMENTS_OFFSET + index * self.element_stride_at(array)?)
    }

    pub(crate) fn table_specification(&self, table: usize) -> Result<(TableSpecification, usize)> {
        let header = self.expect_type(table, ItemType::Table)?;
        TableSpecification::read(
            self.buffer.as_slice(),
            table + header.value_field_offset(),
            self.endianness(),
        )
    }

    /// Absolute offset of a table cell
    pub(crate) fn cell_offset(&self, table: usize, row: usize, column: usize) -> Result<usize> {
        let (spec, _) = self.table_specification(table)?;
        Ok(self.value_field(table)?
            + spec.rows_offset()
            + row * spec.row_byte_count()
            + spec.columns[column].value_offset)
    }

    /// Offsets of every item directly nested in the container at `offset`
    pub(crate) fn children(&self, offset: usize) -> Result<Vec<usize>> {
        let header = self.header(offset)?;
        let vf = offset + header.value_field_offset();
        Ok(match header.item_type {
            ItemType::Dictionary | ItemType::Sequence => {
                child_offsets(self.buffer.as_slice(), offset, &header, self.endianness())?
            }
            ItemType::Array => {
                if !self.element_type_at(offset)?.is_container() {
                    return Ok(Vec::new());
                }
                let stride = self.element_stride_at(offset)?;
                (0..header.count_value as usize)
                    .map(|i| vf + ARRAY_ELEMENTS_OFFSET + i * stride)
                    .collect()
            }
            ItemType::Table => {
                let (spec, rows) = self.table_specification(offset)?;
                let rows_start = vf + spec.rows_offset();
                let mut cells = Vec::new();
                for column in spec.columns.iter().filter(|c| c.value_type.is_container()) {
                    for row in 0..rows {
                        cells.push(rows_start + row * spec.row_byte_count() + column.value_offset);
                    }
                }
                cells
            }
            _ => Vec::new(),
        })
    }

    /// Bytes used by the children of a dictionary or sequence
    pub(crate) fn used_value_bytes(&self, container: usize) -> Result<usize> {
        let header = self.header(container)?;
        let offsets = child_offsets(self.buffer.as_slice(), container, &header, self.endianness())?;
        match offsets.last() {
            Some(&last) => {
                let size = self.header(last)?.item_byte_count as usize;
                Ok(last + size - container - header.value_field_offset())
            }
            None => Ok(0),
        }
    }

    /// Set the parent offset of every descendant of `offset` to its actual container
    pub(crate) fn relink(&mut self, offset: usize) -> Result<()> {
        for child in self.children(offset)? {
            self.buffer
                .write::<u32>(child + ITEM_PARENT_OFFSET_OFFSET, offset as u32)?;
            self.relink(child)?;
        }
        Ok(())
    }

    // --- shifting and growth ---

    /// Move `move_count` bytes from `src` to `dst` and keep portals in step
    ///
    /// Portals inside `[dst, dst + remove_count)` are evicted (the bytes being
    /// overwritten), portals inside the moved block follow it.
    pub(crate) fn move_block(
        &mut self,
        dst: usize,
        src: usize,
        move_count: usize,
        remove_count: usize,
    ) -> Result<()> {
        self.buffer.copy_within(src, dst, move_count)?;
        let portals = self.portals.get_mut();
        portals.invalidate_range(dst, dst + remove_count);
        portals.rebase_range(src, dst, move_count);
        Ok(())
    }

    /// Evict every portal strictly inside the item at `offset`
    pub(crate) fn invalidate_content(&mut self, offset: usize, byte_count: usize) {
        let portals = self.portals.get_mut();
        portals.invalidate_range(offset + 1, offset + byte_count);
        portals.invalidate_indexed(offset);
    }

    /// Evict every portal of the item at `offset`, itself included
    pub(crate) fn invalidate_item(&mut self, offset: usize, byte_count: usize) {
        self.portals.get_mut().invalidate_range(offset, offset + byte_count);
    }

    pub(crate) fn portals_mut(&mut self) -> &mut PortalRegistry {
        self.portals.get_mut()
    }

    /// Make the value field of `offset` at least `value_byte_count` bytes long
    ///
    /// Returns the item's offset afterwards, which moves when an ancestor array
    /// or table had to widen its slots.
    pub(crate) fn ensure_value_capacity(&mut self, offset: usize, value_byte_count: usize) -> Result<usize> {
        let header = self.header(offset)?;
        let required = header.value_field_offset() + value_byte_count;
        if required <= header.item_byte_count as usize {
            return Ok(offset);
        }
        self.increase_item_byte_count(offset, required)
    }

    /// Grow the item at `offset` to `new_byte_count`, growing its ancestors first
    pub(crate) fn increase_item_byte_count(&mut self, offset: usize, new_byte_count: usize) -> Result<usize> {
        let header = self.header(offset)?;
        let current = header.item_byte_count as usize;
        let new_byte_count = round_up8(new_byte_count);
        if new_byte_count <= current {
            return Ok(offset);
        }

        if offset == 0 {
            self.buffer.grow_to(new_byte_count)?;
            self.set_item_byte_count(0, new_byte_count)?;
            return Ok(0);
        }

        let parent = header.parent_offset as usize;
        let parent_header = self.header(parent)?;
        match parent_header.item_type {
            ItemType::Array => {
                let start = parent + parent_header.value_field_offset() + ARRAY_ELEMENTS_OFFSET;
                let stride = self.element_stride_at(parent)?;
                let index = (offset - start) / stride;
                let parent = self.restride(parent, new_byte_count)?;
                self.element_offset(parent, index)
            }
            ItemType::Dictionary | ItemType::Sequence => {
                let relative = offset - parent;
                let delta = new_byte_count - current;
                let used = self.used_value_bytes(parent)?;
                let parent = self.ensure_value_capacity(parent, used + delta)?;

                let offset = parent + relative;
                let end = offset + current;
                let used_end = parent + parent_header.value_field_offset() + used;
                self.move_block(end + delta, end, used_end - end, 0)?;
                self.buffer.zero(end, delta)?;
                self.set_item_byte_count(offset, new_byte_count)?;
                self.relink(parent)?;
                Ok(offset)
            }
            ItemType::Table => {
                let vf = parent + parent_header.value_field_offset();
                let (spec, _) = self.table_specification(parent)?;
                let relative = offset - vf - spec.rows_offset();
                let row = relative / spec.row_byte_count();
                let in_row = relative % spec.row_byte_count();
                let column = spec
                    .columns
                    .iter()
                    .position(|c| c.value_offset == in_row)
                    .ok_or_else(|| BrbonError::malformed(offset, "table cell not on a column boundary"))?;
                let parent = self.widen_column(parent, column, new_byte_count)?;
                self.cell_offset(parent, row, column)
            }
            other => Err(BrbonError::malformed(
                offset,
                format!("item nested in a {other} parent at {parent:#x}"),
            )),
        }
    }

    /// Replace the item at `offset` with `value`, keeping its name and position
    pub(crate) fn replace_item(&mut self, offset: usize, value: Value) -> Result<()> {
        let header = self.header(offset)?;
        if offset != 0 {
            let parent_type = self.header(header.parent_offset as usize)?.item_type;
            if matches!(parent_type, ItemType::Array | ItemType::Table)
                && value.item_type() != header.item_type
            {
                return Err(BrbonError::TypeMismatch {
                    expected: header.item_type.name(),
                    found: value.item_type().name(),
                });
            }
        }
        check_nesting(self.depth_of(offset)?, &value)?;
        let name = self.name_field_at(offset, &header)?;
        let needed = item_byte_count(&value, name.as_ref())?;

        let offset = self.increase_item_byte_count(offset, needed)?;
        let header = self.header(offset)?;
        let size = header.item_byte_count as usize;
        let bytes = encode_item(&value, name.as_ref(), size, self.endianness())?;

        self.invalidate_content(offset, size);
        self.buffer.write_bytes(offset, &bytes)?;
        self.buffer
            .write::<u32>(offset + ITEM_PARENT_OFFSET_OFFSET, header.parent_offset)?;
        self.relink(offset)
    }

    fn name_field_at(&self, offset: usize, header: &ItemHeader) -> Result<Option<NameField>> {
        if header.name_field_byte_count == 0 {
            return Ok(None);
        }
        let start = offset + ITEM_NAME_FIELD_OFFSET;
        let field = &self.buffer.as_slice()[start..start + header.name_field_byte_count as usize];
        Ok(Some(NameField::new(decode_name(field, start)?)?))
    }

    // --- reads ---

    /// Lenient mode logs and yields `None`; strict mode panics
    pub(crate) fn misuse<T>(&self, message: fmt::Arguments<'_>) -> Option<T> {
        if self.strict {
            error!("{}", message);
            panic!("{}", message);
        }
        warn!("{}", message);
        None
    }

    pub(crate) fn resolve(&self, portal: &Portal) -> Option<Location> {
        match self.locate(portal) {
            Ok(location) => Some(location),
            Err(err) => self.misuse(format_args!("read through {portal}: {err}")),
        }
    }

    pub(crate) fn lenient<T>(&self, portal: &Portal, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(err) => self.misuse(format_args!("read through {portal}: {err}")),
        }
    }

    /// Type of the item, element or cell
    pub fn item_type(&self, portal: &Portal) -> Option<ItemType> {
        let result = match self.resolve(portal)? {
            Location::Item(offset) => self.header(offset).map(|h| h.item_type),
            Location::Element { array, .. } => self.element_type_at(array),
            Location::Cell { table, column, .. } => self
                .table_specification(table)
                .map(|(spec, _)| spec.columns[column].value_type),
        };
        self.lenient(portal, result)
    }

    /// Name of an item; `None` for unnamed items, elements and cells
    pub fn name(&self, portal: &Portal) -> Option<String> {
        match self.resolve(portal)? {
            Location::Item(offset) => {
                let result = self
                    .header(offset)
                    .and_then(|h| self.name_field_at(offset, &h));
                self.lenient(portal, result)?.map(|f| f.as_str().to_string())
            }
            _ => None,
        }
    }

    /// Element, child or row count of a container
    pub fn count(&self, portal: &Portal) -> Option<usize> {
        let location = self.resolve(portal)?;
        let offset = match location {
            Location::Item(offset) => offset,
            _ => return self.misuse(format_args!("count of non-container {portal}")),
        };
        let header = self.lenient(portal, self.header(offset))?;
        match header.item_type {
            ItemType::Array | ItemType::Dictionary | ItemType::Sequence => {
                Some(header.count_value as usize)
            }
            ItemType::Table => {
                let result = self.table_specification(offset).map(|(_, rows)| rows);
                self.lenient(portal, result)
            }
            other => self.misuse(format_args!("count of {other} item {portal}")),
        }
    }

    /// Bytes occupied: item size, element stride or column width
    pub fn item_byte_count(&self, portal: &Portal) -> Option<usize> {
        let result = match self.resolve(portal)? {
            Location::Item(offset) => self.header(offset).map(|h| h.item_byte_count as usize),
            Location::Element { array, .. } => self.element_stride_at(array),
            Location::Cell { table, column, .. } => self
                .table_specification(table)
                .map(|(spec, _)| spec.columns[column].value_byte_count),
        };
        self.lenient(portal, result)
    }

    /// Materialize the value behind `portal`
    pub fn value(&self, portal: &Portal) -> Option<Value> {
        let location = self.resolve(portal)?;
        let result = self.value_at(location);
        self.lenient(portal, result)
    }

    pub(crate) fn value_at(&self, location: Location) -> Result<Value> {
        let bytes = self.buffer.as_slice();
        let endianness = self.endianness();
        match location {
            Location::Item(offset) => decode_item(bytes, offset, endianness).map(|(_, v)| v),
            Location::Element { array, index } => {
                let element_type = self.element_type_at(array)?;
                decode_element(bytes, self.element_offset(array, index)?, element_type, endianness)
            }
            Location::Cell { table, row, column } => {
                let (spec, _) = self.table_specification(table)?;
                let offset = self.cell_offset(table, row, column)?;
                decode_element(bytes, offset, spec.columns[column].value_type, endianness)
            }
        }
    }

    /// Type and absolute offset of the scalar bytes behind a location
    fn scalar_slot(&self, location: Location) -> Result<(ItemType, usize)> {
        match location {
            Location::Item(offset) => {
                let header = self.header(offset)?;
                let at = if header.item_type.is_small() {
                    offset + ITEM_COUNT_VALUE_OFFSET
                } else {
                    offset + header.value_field_offset()
                };
                Ok((header.item_type, at))
            }
            Location::Element { array, index } => {
                Ok((self.element_type_at(array)?, self.element_offset(array, index)?))
            }
            Location::Cell { table, row, column } => {
                let (spec, _) = self.table_specification(table)?;
                Ok((spec.columns[column].value_type, self.cell_offset(table, row, column)?))
            }
        }
    }

    /// Typed scalar read; `None` when the stored type differs from `T`
    pub fn get<T: Scalar>(&self, portal: &Portal) -> Option<T> {
        let location = self.resolve(portal)?;
        let (item_type, at) = self.lenient(portal, self.scalar_slot(location))?;
        if item_type != T::ITEM_TYPE {
            return self.misuse(format_args!(
                "read of {} through {portal} holding {item_type}",
                T::ITEM_TYPE
            ));
        }
        self.lenient(portal, self.buffer.read::<T>(at))
    }

    /// String or crcString content
    pub fn get_string(&self, portal: &Portal) -> Option<String> {
        match self.value(portal)? {
            Value::String(s) | Value::CrcString(s) => Some(s),
            other => self.misuse(format_args!(
                "string read through {portal} holding {}",
                other.item_type()
            )),
        }
    }

    /// Binary or crcBinary content
    pub fn get_binary(&self, portal: &Portal) -> Option<Vec<u8>> {
        match self.value(portal)? {
            Value::Binary(b) | Value::CrcBinary(b) => Some(b),
            other => self.misuse(format_args!(
                "binary read through {portal} holding {}",
                other.item_type()
            )),
        }
    }

    // --- writes ---

    /// Overwrite the value behind `portal`
    ///
    /// Items may change type; array elements and table cells must keep
    /// theirs. The item, its ancestors and the buffer grow as needed.
    pub fn set(&mut self, portal: &Portal, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.locate(portal)? {
            Location::Item(offset) => self.replace_item(offset, value),
            Location::Element { array, index } => self.set_element(array, index, value),
            Location::Cell { table, row, column } => self.set_cell(table, row, column, value),
        }
    }

    // --- positional containers ---

    fn positional(&self, portal: &Portal) -> Result<(usize, ItemType)> {
        let found = match self.locate(portal)? {
            Location::Item(offset) => {
                let item_type = self.header(offset)?.item_type;
                if matches!(item_type, ItemType::Array | ItemType::Sequence) {
                    return Ok((offset, item_type));
                }
                item_type.name()
            }
            _ => "element",
        };
        Err(BrbonError::TypeMismatch {
            expected: "array or sequence",
            found,
        })
    }

    /// Append to an array, or an unnamed child to a sequence
    pub fn append(&mut self, container: &Portal, value: impl Into<Value>) -> Result<()> {
        let (offset, item_type) = self.positional(container)?;
        let count = self.header(offset)?.count_value as usize;
        match item_type {
            ItemType::Array => self.insert_element(offset, count, value.into()),
            _ => self.insert_child(offset, count, value.into(), None).map(|_| ()),
        }
    }

    /// Insert before position `index` of an array or sequence
    pub fn insert(&mut self, container: &Portal, index: usize, value: impl Into<Value>) -> Result<()> {
        let (offset, item_type) = self.positional(container)?;
        match item_type {
            ItemType::Array => self.insert_element(offset, index, value.into()),
            _ => self.insert_child(offset, index, value.into(), None).map(|_| ()),
        }
    }

    /// Remove position `index` of an array or sequence
    pub fn remove(&mut self, container: &Portal, index: usize) -> Result<()> {
        let (offset, item_type) = self.positional(container)?;
        match item_type {
            ItemType::Array => self.remove_element(offset, index),
            _ => self.remove_child(offset, index),
        }
    }

    /// Portal for position `index` of an array or sequence
    pub fn element(&self, container: &Portal, index: usize) -> Result<Portal> {
        let (offset, item_type) = self.positional(container)?;
        match item_type {
            ItemType::Array => self.element_portal(offset, index),
            _ => self.child_portal(offset, index),
        }
    }

    pub(crate) fn encode_value(&self, value: &Value, name: Option<&NameField>) -> Result<Vec<u8>> {
        encode_item(value, name, 0, self.endianness())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArrayValue;

    fn manager(value: Value) -> ItemManager {
        ItemManager::with_root(value, None, ManagerConfig::default()).unwrap()
    }

    #[test]
    fn test_new_root_is_empty_dictionary() {
        let m = ItemManager::new(ManagerConfig::default()).unwrap();
        let root = m.root();
        assert_eq!(m.item_type(&root), Some(ItemType::Dictionary));
        assert_eq!(m.count(&root), Some(0));
        assert_eq!(m.as_bytes().len(), 16);
        assert_eq!(m.unused_bytes(), 1024 - 16);
    }

    #[test]
    fn test_root_scalar_get_set() {
        let mut m = manager(Value::UInt32(7));
        let root = m.root();
        assert_eq!(m.get::<u32>(&root), Some(7));
        assert_eq!(m.get::<i32>(&root), None);

        m.set(&root, 9u32).unwrap();
        assert_eq!(m.get::<u32>(&root), Some(9));

        // items may change type
        m.set(&root, "now a string").unwrap();
        assert_eq!(m.get_string(&root).as_deref(), Some("now a string"));
        // 16 header + 4 length + 12 bytes
        assert_eq!(m.item_byte_count(&root), Some(32));
    }

    #[test]
    fn test_root_name_is_kept_on_set() {
        let mut m = ItemManager::with_root(Value::Int64(1), Some("answer"), ManagerConfig::default()).unwrap();
        let root = m.root();
        m.set(&root, Value::Int64(42)).unwrap();
        assert_eq!(m.name(&root).as_deref(), Some("answer"));
        assert_eq!(m.get::<i64>(&root), Some(42));
    }

    #[test]
    fn test_export_load_round_trip() {
        let m = manager(Value::Array(ArrayValue::with_elements(
            ItemType::Int16,
            vec![Value::Int16(-1), Value::Int16(2)],
        )));
        let bytes = m.export();
        let loaded = ItemManager::load(&bytes, ManagerConfig::default()).unwrap();
        assert_eq!(loaded.export(), bytes);
        assert_eq!(loaded.value(&loaded.root()), m.value(&m.root()));
    }

    #[test]
    fn test_retain_release_counts() {
        let m = manager(Value::Bool(true));
        let root = m.root();
        let copy = m.retain(&root).unwrap();
        assert_eq!(m.portal_count(), 1);

        m.release(root);
        assert_eq!(m.get::<bool>(&copy), Some(true));

        let again = m.retain(&copy).unwrap();
        m.release(copy);
        assert!(m.is_valid(&again));
        m.release(again);
        assert_eq!(m.portal_count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_strict_mode_panics_on_mismatch() {
        let config = ManagerConfig {
            strict: true,
            ..ManagerConfig::default()
        };
        let m = ItemManager::with_root(Value::UInt8(1), None, config).unwrap();
        let root = m.root();
        let _ = m.get::<u64>(&root);
    }

    #[test]
    fn test_move_block_rekeys_portals() {
        let mut m = manager(Value::Null);
        m.buffer.grow_to(128).unwrap();
        let moved = m.portal(PortalKey::item(32));
        let removed = m.portal(PortalKey::item(16));
        m.move_block(16, 32, 16, 16).unwrap();
        assert!(!m.is_valid(&removed));
        assert_eq!(m.portals.borrow().key(&moved), Some(PortalKey::item(16)));
    }
}
