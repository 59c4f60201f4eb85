//! Structural checks run before a buffer is adopted
//!
//! The walk visits every item once and stops at the first violation, which
//! is reported as `MalformedBuffer` with the offending offset.

use crate::codec::Endianness;
use crate::crc::crc32;
use crate::error::{BrbonError, Result};
use crate::item::{decode_content, min_element_byte_count};
use crate::item_type::ItemType;
use crate::layout::{
    read_at, ItemHeader, ARRAY_ELEMENTS_OFFSET, ARRAY_ELEMENT_BYTE_COUNT_OFFSET,
    ARRAY_ELEMENT_TYPE_OFFSET, ITEM_HEADER_BYTE_COUNT, ITEM_NAME_FIELD_OFFSET,
};
use crate::name::{decode_name, MAX_NAME_BYTES};
use crate::table::TableSpecification;
use std::collections::HashSet;

/// Deepest nesting accepted on load
pub const MAX_NESTING_DEPTH: usize = 128;

/// Validate a whole buffer; returns the root item's byte count
pub fn validate_buffer(bytes: &[u8], endianness: Endianness) -> Result<usize> {
    if bytes.len() < ITEM_HEADER_BYTE_COUNT {
        return Err(BrbonError::malformed(0, "buffer shorter than an item header"));
    }
    let root = ItemHeader::decode(bytes, 0, endianness)?;
    if root.parent_offset != 0 {
        return Err(BrbonError::malformed(0, "root parent offset is not 0"));
    }
    let size = root.item_byte_count as usize;
    if size > bytes.len() {
        return Err(BrbonError::malformed(
            0,
            format!("root byte count {size} exceeds buffer length {}", bytes.len()),
        ));
    }
    Validator { bytes, endianness }.item(0, 0, size, 0)?;
    Ok(size)
}

struct Validator<'a> {
    bytes: &'a [u8],
    endianness: Endianness,
}

impl Validator<'_> {
    /// Check the item at `offset`, which may occupy at most `limit` bytes
    fn item(&self, offset: usize, parent: usize, limit: usize, depth: usize) -> Result<ItemHeader> {
        if depth > MAX_NESTING_DEPTH {
            return Err(BrbonError::malformed(offset, "nesting too deep"));
        }
        if offset % 8 != 0 {
            return Err(BrbonError::malformed(offset, "item not 8-byte aligned"));
        }
        let header = ItemHeader::decode(self.bytes, offset, self.endianness)?;
        let size = header.item_byte_count as usize;
        let name_bytes = header.name_field_byte_count as usize;

        if size % 8 != 0 {
            return Err(BrbonError::malformed(offset, format!("item byte count {size} not a multiple of 8")));
        }
        if size < ITEM_HEADER_BYTE_COUNT + name_bytes {
            return Err(BrbonError::malformed(offset, "item smaller than its header and name"));
        }
        if size > limit || offset + size > self.bytes.len() {
            return Err(BrbonError::malformed(offset, "item exceeds its container"));
        }
        if header.parent_offset as usize != parent {
            return Err(BrbonError::malformed(
                offset,
                format!("parent offset {:#x}, expected {:#x}", header.parent_offset, parent),
            ));
        }
        if name_bytes > 0 {
            self.name_field(offset, name_bytes)?;
        }

        let vf = offset + header.value_field_offset();
        let capacity = header.value_field_capacity();
        match header.item_type {
            t if t.is_small() => {}
            ItemType::Int64 | ItemType::UInt64 | ItemType::Float64 => {
                if capacity < 8 {
                    return Err(BrbonError::malformed(offset, "value field too small for a 64-bit value"));
                }
            }
            t if t.is_variable_length() => self.content(vf, t, capacity)?,
            ItemType::Array => self.array(offset, &header, depth)?,
            ItemType::Dictionary | ItemType::Sequence => self.children(offset, &header, depth)?,
            ItemType::Table => self.table(offset, &header, depth)?,
            _ => {}
        }
        Ok(header)
    }

    fn name_field(&self, offset: usize, name_bytes: usize) -> Result<()> {
        let start = offset + ITEM_NAME_FIELD_OFFSET;
        if name_bytes % 8 != 0 {
            return Err(BrbonError::malformed(start, "name field not a multiple of 8"));
        }
        let field = self
            .bytes
            .get(start..start + name_bytes)
            .ok_or_else(|| BrbonError::malformed(start, "name field past end of buffer"))?;
        let len = field[2] as usize;
        if len == 0 || len > MAX_NAME_BYTES || 3 + len > name_bytes {
            return Err(BrbonError::malformed(start, format!("name length {len} invalid")));
        }
        let name = decode_name(field, start)?;
        let stored = read_at::<u16>(field, 0, self.endianness)?;
        if stored != crate::crc::crc16(name.as_bytes()) {
            return Err(BrbonError::malformed(start, "name hash mismatch"));
        }
        Ok(())
    }

    /// String or binary content at `at`, inside a slot of `slot` bytes
    fn content(&self, at: usize, item_type: ItemType, slot: usize) -> Result<()> {
        let prefix = item_type.content_prefix();
        if slot < prefix {
            return Err(BrbonError::malformed(at, "value field too small for a length prefix"));
        }
        let content = decode_content(self.bytes, at, item_type, self.endianness)?;
        if prefix + content.len() > slot {
            return Err(BrbonError::malformed(at, "content exceeds its slot"));
        }
        if matches!(item_type, ItemType::String | ItemType::CrcString)
            && std::str::from_utf8(content).is_err()
        {
            return Err(BrbonError::malformed(at, "string is not valid UTF-8"));
        }
        if prefix == 8 && read_at::<u32>(self.bytes, at, self.endianness)? != crc32(content) {
            return Err(BrbonError::malformed(at, "content checksum mismatch"));
        }
        Ok(())
    }

    fn array(&self, offset: usize, header: &ItemHeader, depth: usize) -> Result<()> {
        let vf = offset + header.value_field_offset();
        if header.value_field_capacity() < ARRAY_ELEMENTS_OFFSET {
            return Err(BrbonError::malformed(offset, "array value field too small"));
        }
        let tag = read_at::<u8>(self.bytes, vf + ARRAY_ELEMENT_TYPE_OFFSET, self.endianness)?;
        let element_type = ItemType::parse(tag, vf)?;
        if element_type == ItemType::Null {
            return Err(BrbonError::malformed(vf, "null element type"));
        }
        let stride = read_at::<u32>(self.bytes, vf + ARRAY_ELEMENT_BYTE_COUNT_OFFSET, self.endianness)? as usize;
        if stride < min_element_byte_count(element_type, None)? {
            return Err(BrbonError::malformed(vf, format!("element stride {stride} below the minimum")));
        }
        if element_type.scalar_byte_count().is_none() && stride % 8 != 0 {
            return Err(BrbonError::malformed(vf, "element stride not a multiple of 8"));
        }
        let count = header.count_value as usize;
        let needed = count
            .checked_mul(stride)
            .and_then(|n| n.checked_add(ARRAY_ELEMENTS_OFFSET))
            .ok_or_else(|| BrbonError::malformed(offset, "element count overflows"))?;
        if needed > header.value_field_capacity() {
            return Err(BrbonError::malformed(offset, "elements exceed the array"));
        }

        for i in 0..count {
            let at = vf + ARRAY_ELEMENTS_OFFSET + i * stride;
            self.slot(at, offset, element_type, stride, depth)?;
        }
        Ok(())
    }

    /// One array element or table cell
    fn slot(&self, at: usize, container: usize, value_type: ItemType, width: usize, depth: usize) -> Result<()> {
        if value_type.is_container() {
            let child = self.item(at, container, width, depth + 1)?;
            if child.item_byte_count as usize != width {
                return Err(BrbonError::malformed(at, "nested item does not fill its slot"));
            }
            if child.item_type != value_type {
                return Err(BrbonError::malformed(at, "nested item type differs from its slot type"));
            }
        } else if value_type.is_variable_length() {
            self.content(at, value_type, width)?;
        }
        Ok(())
    }

    fn children(&self, offset: usize, header: &ItemHeader, depth: usize) -> Result<()> {
        let end = offset + header.item_byte_count as usize;
        let mut pos = offset + header.value_field_offset();
        let mut names = HashSet::new();
        for _ in 0..header.count_value {
            if pos >= end {
                return Err(BrbonError::malformed(offset, "child count exceeds the value field"));
            }
            let child = self.item(pos, offset, end - pos, depth + 1)?;
            if header.item_type == ItemType::Dictionary {
                if child.name_field_byte_count == 0 {
                    return Err(BrbonError::malformed(pos, "unnamed dictionary entry"));
                }
                let start = pos + ITEM_NAME_FIELD_OFFSET;
                let field = &self.bytes[start..start + child.name_field_byte_count as usize];
                if !names.insert(decode_name(field, start)?) {
                    return Err(BrbonError::malformed(pos, "duplicate dictionary name"));
                }
            }
            pos += child.item_byte_count as usize;
        }
        Ok(())
    }

    fn table(&self, offset: usize, header: &ItemHeader, depth: usize) -> Result<()> {
        let vf = offset + header.value_field_offset();
        if header.value_field_capacity() < crate::layout::TABLE_COLUMN_DESCRIPTORS_OFFSET {
            return Err(BrbonError::malformed(offset, "table value field too small"));
        }
        let (spec, rows) = TableSpecification::read(self.bytes, vf, self.endianness)?;
        let needed = rows
            .checked_mul(spec.row_byte_count())
            .and_then(|n| n.checked_add(spec.rows_offset()))
            .ok_or_else(|| BrbonError::malformed(offset, "row count overflows"))?;
        if needed > header.value_field_capacity() {
            return Err(BrbonError::malformed(offset, "rows exceed the table"));
        }

        let rows_start = vf + spec.rows_offset();
        for row in 0..rows {
            for column in &spec.columns {
                let at = rows_start + row * spec.row_byte_count() + column.value_offset;
                self.slot(at, offset, column.value_type, column.value_byte_count, depth)?;
            }
        }
        Ok(())
    }
}
