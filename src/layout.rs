//! Byte layout of items, array headers and table descriptors
//!
//! ```text
//! Item:   [type:u8][options:u8][flags:u8][nameFieldByteCount:u8]
//!         [itemByteCount:u32][parentOffset:u32][countOrSmallValue:u32]
//!         [name field]?
//!         [value field]
//! Array:  [elementType:u8][0:u8][0:u16][elementByteCount:u32][elements..]
//! Table:  [rowCount:u32][columnCount:u32][rowsOffset:u32][rowByteCount:u32]
//!         [column descriptors..][column names..][rows..]
//! Column: [nameCrc:u16][nameByteCount:u8][valueType:u8]
//!         [nameOffset:u32][valueOffset:u32][valueByteCount:u32]
//! ```
//!
//! All sizes are multiples of 8 so nested items stay 8-byte aligned.

use crate::codec::{Codec, Endianness};
use crate::error::{BrbonError, Result};
use crate::item_type::ItemType;

pub const ITEM_HEADER_BYTE_COUNT: usize = 16;

pub const ITEM_TYPE_OFFSET: usize = 0;
pub const ITEM_OPTIONS_OFFSET: usize = 1;
pub const ITEM_FLAGS_OFFSET: usize = 2;
pub const ITEM_NAME_FIELD_BYTE_COUNT_OFFSET: usize = 3;
pub const ITEM_BYTE_COUNT_OFFSET: usize = 4;
pub const ITEM_PARENT_OFFSET_OFFSET: usize = 8;
pub const ITEM_COUNT_VALUE_OFFSET: usize = 12;
pub const ITEM_NAME_FIELD_OFFSET: usize = 16;

/// Relative to the array value field
pub const ARRAY_ELEMENT_TYPE_OFFSET: usize = 0;
pub const ARRAY_ELEMENT_BYTE_COUNT_OFFSET: usize = 4;
pub const ARRAY_ELEMENTS_OFFSET: usize = 8;

/// Relative to the table value field
pub const TABLE_ROW_COUNT_OFFSET: usize = 0;
pub const TABLE_COLUMN_COUNT_OFFSET: usize = 4;
pub const TABLE_ROWS_OFFSET_OFFSET: usize = 8;
pub const TABLE_ROW_BYTE_COUNT_OFFSET: usize = 12;
pub const TABLE_COLUMN_DESCRIPTORS_OFFSET: usize = 16;
pub const COLUMN_DESCRIPTOR_BYTE_COUNT: usize = 16;

/// Relative to a column descriptor
const COLUMN_NAME_CRC_OFFSET: usize = 0;
const COLUMN_NAME_BYTE_COUNT_OFFSET: usize = 2;
const COLUMN_VALUE_TYPE_OFFSET: usize = 3;
const COLUMN_NAME_OFFSET_OFFSET: usize = 4;
const COLUMN_VALUE_OFFSET_OFFSET: usize = 8;
const COLUMN_VALUE_BYTE_COUNT_OFFSET: usize = 12;

/// Round up to the next multiple of 8
#[inline]
pub const fn round_up8(n: usize) -> usize {
    (n + 7) & !7
}

/// Bounds-checked scalar read from a byte slice
#[inline]
pub fn read_at<T: Codec>(bytes: &[u8], offset: usize, endianness: Endianness) -> Result<T> {
    let end = offset
        .checked_add(T::BYTE_COUNT)
        .ok_or_else(|| BrbonError::malformed(offset, "offset overflow"))?;
    let slice = bytes.get(offset..end).ok_or_else(|| {
        BrbonError::malformed(offset, format!("read of {} bytes past end {}", T::BYTE_COUNT, bytes.len()))
    })?;
    Ok(T::decode(slice, endianness))
}

/// Bounds-checked scalar write into a byte slice
#[inline]
pub fn write_at<T: Codec>(
    bytes: &mut [u8],
    offset: usize,
    value: T,
    endianness: Endianness,
) -> Result<()> {
    let len = bytes.len();
    let slice = bytes
        .get_mut(offset..offset + T::BYTE_COUNT)
        .ok_or_else(|| BrbonError::malformed(offset, format!("write past end {len}")))?;
    value.encode(endianness, slice);
    Ok(())
}

/// Fixed 16-byte item header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHeader {
    pub item_type: ItemType,
    pub options: u8,
    pub flags: u8,
    pub name_field_byte_count: u8,
    pub item_byte_count: u32,
    pub parent_offset: u32,
    pub count_value: u32,
}

impl ItemHeader {
    pub fn new(item_type: ItemType) -> Self {
        ItemHeader {
            item_type,
            options: 0,
            flags: 0,
            name_field_byte_count: 0,
            item_byte_count: 0,
            parent_offset: 0,
            count_value: 0,
        }
    }

    /// Write the header fields in their fixed order
    pub fn encode(&self, endianness: Endianness, out: &mut [u8]) {
        out[ITEM_TYPE_OFFSET] = self.item_type as u8;
        out[ITEM_OPTIONS_OFFSET] = self.options;
        out[ITEM_FLAGS_OFFSET] = self.flags;
        out[ITEM_NAME_FIELD_BYTE_COUNT_OFFSET] = self.name_field_byte_count;
        self.item_byte_count
            .encode(endianness, &mut out[ITEM_BYTE_COUNT_OFFSET..]);
        self.parent_offset
            .encode(endianness, &mut out[ITEM_PARENT_OFFSET_OFFSET..]);
        self.count_value
            .encode(endianness, &mut out[ITEM_COUNT_VALUE_OFFSET..]);
    }

    /// Read a header from `bytes` at `offset`
    pub fn decode(bytes: &[u8], offset: usize, endianness: Endianness) -> Result<Self> {
        let raw = bytes
            .get(offset..offset + ITEM_HEADER_BYTE_COUNT)
            .ok_or_else(|| BrbonError::malformed(offset, "item header past end of buffer"))?;
        Ok(ItemHeader {
            item_type: ItemType::parse(raw[ITEM_TYPE_OFFSET], offset)?,
            options: raw[ITEM_OPTIONS_OFFSET],
            flags: raw[ITEM_FLAGS_OFFSET],
            name_field_byte_count: raw[ITEM_NAME_FIELD_BYTE_COUNT_OFFSET],
            item_byte_count: u32::decode(&raw[ITEM_BYTE_COUNT_OFFSET..], endianness),
            parent_offset: u32::decode(&raw[ITEM_PARENT_OFFSET_OFFSET..], endianness),
            count_value: u32::decode(&raw[ITEM_COUNT_VALUE_OFFSET..], endianness),
        })
    }

    /// Offset of the value field relative to the item start
    pub fn value_field_offset(&self) -> usize {
        ITEM_HEADER_BYTE_COUNT + self.name_field_byte_count as usize
    }

    /// Bytes available to the value field
    pub fn value_field_capacity(&self) -> usize {
        (self.item_byte_count as usize).saturating_sub(self.value_field_offset())
    }
}

/// One 16-byte table column descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name_crc: u16,
    pub name_byte_count: u8,
    pub value_type: ItemType,
    /// Relative to the table value field
    pub name_offset: u32,
    /// Relative to the start of a row
    pub value_offset: u32,
    pub value_byte_count: u32,
}

impl ColumnDescriptor {
    pub fn encode(&self, endianness: Endianness, out: &mut [u8]) {
        self.name_crc
            .encode(endianness, &mut out[COLUMN_NAME_CRC_OFFSET..]);
        out[COLUMN_NAME_BYTE_COUNT_OFFSET] = self.name_byte_count;
        out[COLUMN_VALUE_TYPE_OFFSET] = self.value_type as u8;
        self.name_offset
            .encode(endianness, &mut out[COLUMN_NAME_OFFSET_OFFSET..]);
        self.value_offset
            .encode(endianness, &mut out[COLUMN_VALUE_OFFSET_OFFSET..]);
        self.value_byte_count
            .encode(endianness, &mut out[COLUMN_VALUE_BYTE_COUNT_OFFSET..]);
    }

    pub fn decode(bytes: &[u8], offset: usize, endianness: Endianness) -> Result<Self> {
        let raw = bytes
            .get(offset..offset + COLUMN_DESCRIPTOR_BYTE_COUNT)
            .ok_or_else(|| BrbonError::malformed(offset, "column descriptor past end of buffer"))?;
        Ok(ColumnDescriptor {
            name_crc: u16::decode(&raw[COLUMN_NAME_CRC_OFFSET..], endianness),
            name_byte_count: raw[COLUMN_NAME_BYTE_COUNT_OFFSET],
            value_type: ItemType::parse(raw[COLUMN_VALUE_TYPE_OFFSET], offset + COLUMN_VALUE_TYPE_OFFSET)?,
            name_offset: u32::decode(&raw[COLUMN_NAME_OFFSET_OFFSET..], endianness),
            value_offset: u32::decode(&raw[COLUMN_VALUE_OFFSET_OFFSET..], endianness),
            value_byte_count: u32::decode(&raw[COLUMN_VALUE_BYTE_COUNT_OFFSET..], endianness),
        })
    }
}
