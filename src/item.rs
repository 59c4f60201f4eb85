//! Item sizing, encoding and decoding
//!
//! Sizing validates a [`Value`] completely (names, element types, fixed
//! sizes) so that the encoders that run afterwards cannot fail on content.
//! Encoded items carry zero parent offsets; the manager relinks them
//! once they are placed in the buffer.

use crate::codec::{Codec, Endianness};
use crate::crc::crc32;
use crate::error::{BrbonError, Result};
use crate::item_type::ItemType;
use crate::layout::{
    read_at, round_up8, ItemHeader, ARRAY_ELEMENTS_OFFSET, ARRAY_ELEMENT_BYTE_COUNT_OFFSET,
    ARRAY_ELEMENT_TYPE_OFFSET, ITEM_COUNT_VALUE_OFFSET, ITEM_HEADER_BYTE_COUNT,
    ITEM_NAME_FIELD_OFFSET,
};
use crate::name::{decode_name, NameField};
use crate::table::TableSpecification;
use crate::validate::MAX_NESTING_DEPTH;
use crate::value::{ArrayValue, TableValue, Value};
use std::collections::HashSet;

/// Minimum value field byte count of `value`
pub fn value_byte_count(value: &Value) -> Result<usize> {
    Ok(match value {
        Value::Null
        | Value::Bool(_)
        | Value::Int8(_)
        | Value::Int16(_)
        | Value::Int32(_)
        | Value::UInt8(_)
        | Value::UInt16(_)
        | Value::UInt32(_)
        | Value::Float32(_) => 0,
        Value::Int64(_) | Value::UInt64(_) | Value::Float64(_) => 8,
        Value::String(_) | Value::CrcString(_) | Value::Binary(_) | Value::CrcBinary(_) => {
            let len = value.content_bytes().map_or(0, <[u8]>::len);
            value.item_type().content_prefix() + len
        }
        Value::Array(array) => {
            ARRAY_ELEMENTS_OFFSET + array_stride(array)? * array.elements.len()
        }
        Value::Dictionary(entries) => {
            let mut seen = HashSet::new();
            let mut total = 0;
            for (name, child) in entries {
                let field = NameField::new(name.as_str())?;
                if !seen.insert(name.as_str()) {
                    return Err(BrbonError::InvalidName(format!(
                        "duplicate dictionary name '{name}'"
                    )));
                }
                total += item_byte_count(child, Some(&field))?;
            }
            total
        }
        Value::Sequence(entries) => {
            let mut total = 0;
            for (name, child) in entries {
                let field = NameField::optional(name.as_deref())?;
                total += item_byte_count(child, field.as_ref())?;
            }
            total
        }
        Value::Table(table) => {
            let spec = TableSpecification::from_value(table)?;
            spec.value_byte_count(table.rows.len())
        }
    })
}

/// Total item byte count: header, name field and value field, rounded up to 8
pub fn item_byte_count(value: &Value, name: Option<&NameField>) -> Result<usize> {
    let name_bytes = name.map_or(0, NameField::byte_count);
    Ok(round_up8(
        ITEM_HEADER_BYTE_COUNT + name_bytes + value_byte_count(value)?,
    ))
}

/// Levels of items that `value` places below its own item
///
/// Tables with a container column count one level even without rows, since
/// adding rows creates those cells.
pub fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Dictionary(entries) => entries
            .iter()
            .map(|(_, child)| 1 + nesting_depth(child))
            .max()
            .unwrap_or(0),
        Value::Sequence(entries) => entries
            .iter()
            .map(|(_, child)| 1 + nesting_depth(child))
            .max()
            .unwrap_or(0),
        Value::Array(array) => array
            .elements
            .iter()
            .map(|element| 1 + nesting_depth(element))
            .max()
            .unwrap_or(0),
        Value::Table(table) => {
            let cells = table
                .rows
                .iter()
                .flatten()
                .map(|cell| 1 + nesting_depth(cell))
                .max()
                .unwrap_or(0);
            let containers = table.columns.iter().any(|c| c.value_type.is_container());
            cells.max(usize::from(containers))
        }
        _ => 0,
    }
}

/// Reject `value` when written at `depth` it would nest deeper than `load` accepts
pub(crate) fn check_nesting(depth: usize, value: &Value) -> Result<()> {
    let deepest = depth + nesting_depth(value);
    if deepest > MAX_NESTING_DEPTH {
        return Err(BrbonError::NestingTooDeep {
            depth: deepest,
            max: MAX_NESTING_DEPTH,
        });
    }
    Ok(())
}

/// Smallest slot that holds `value` (or the type's empty value) as an array element or table cell
pub fn min_element_byte_count(element_type: ItemType, value: Option<&Value>) -> Result<usize> {
    if let Some(v) = value {
        if v.item_type() != element_type {
            return Err(BrbonError::TypeMismatch {
                expected: element_type.name(),
                found: v.item_type().name(),
            });
        }
    }
    if element_type == ItemType::Null {
        return Err(BrbonError::TypeMismatch {
            expected: "non-null element type",
            found: "null",
        });
    }
    if let Some(width) = element_type.scalar_byte_count() {
        return Ok(width);
    }
    if element_type.is_variable_length() {
        let len = value.and_then(Value::content_bytes).map_or(0, <[u8]>::len);
        return Ok(round_up8(element_type.content_prefix() + len));
    }
    match value {
        Some(v) => item_byte_count(v, None),
        None => item_byte_count(&Value::default_for(element_type), None),
    }
}

/// Requested byte counts of non-scalar slots are rounded to keep nested items aligned
pub(crate) fn normalize_slot(element_type: ItemType, requested: usize) -> usize {
    if element_type.scalar_byte_count().is_some() {
        requested
    } else {
        round_up8(requested)
    }
}

/// Element stride of an array value
pub fn array_stride(array: &ArrayValue) -> Result<usize> {
    let mut minimum = min_element_byte_count(array.element_type, None)?;
    for element in &array.elements {
        minimum = minimum.max(min_element_byte_count(array.element_type, Some(element))?);
    }
    match array.element_byte_count {
        Some(requested) => {
            let requested = normalize_slot(array.element_type, requested);
            if requested < minimum {
                return Err(BrbonError::FixedSizeTooSmall { requested, minimum });
            }
            Ok(requested)
        }
        None => Ok(minimum),
    }
}

/// Encode a complete item, at least `min_item_byte_count` bytes long
pub(crate) fn encode_item(
    value: &Value,
    name: Option<&NameField>,
    min_item_byte_count: usize,
    endianness: Endianness,
) -> Result<Vec<u8>> {
    let needed = item_byte_count(value, name)?;
    let total = needed.max(round_up8(min_item_byte_count));
    let mut out = vec![0u8; total];

    let mut header = ItemHeader::new(value.item_type());
    header.item_byte_count = total as u32;
    if let Some(field) = name {
        header.name_field_byte_count = field.byte_count() as u8;
        field.encode(
            endianness,
            &mut out[ITEM_NAME_FIELD_OFFSET..ITEM_NAME_FIELD_OFFSET + field.byte_count()],
        );
    }
    let vf = header.value_field_offset();

    match value {
        Value::Array(array) => header.count_value = array.elements.len() as u32,
        Value::Dictionary(entries) => header.count_value = entries.len() as u32,
        Value::Sequence(entries) => header.count_value = entries.len() as u32,
        _ => {}
    }
    header.encode(endianness, &mut out);

    if value.item_type().is_small() {
        encode_small(value, endianness, &mut out[ITEM_COUNT_VALUE_OFFSET..ITEM_HEADER_BYTE_COUNT]);
    } else {
        encode_value_field(value, endianness, &mut out[vf..])?;
    }
    Ok(out)
}

/// Write a small value into the 4-byte count/value slot
pub(crate) fn encode_small(value: &Value, endianness: Endianness, slot: &mut [u8]) {
    slot[..4].fill(0);
    match value {
        Value::Bool(v) => v.encode(endianness, slot),
        Value::Int8(v) => v.encode(endianness, slot),
        Value::Int16(v) => v.encode(endianness, slot),
        Value::Int32(v) => v.encode(endianness, slot),
        Value::UInt8(v) => v.encode(endianness, slot),
        Value::UInt16(v) => v.encode(endianness, slot),
        Value::UInt32(v) => v.encode(endianness, slot),
        Value::Float32(v) => v.encode(endianness, slot),
        _ => {}
    }
}

fn encode_scalar(value: &Value, endianness: Endianness, out: &mut [u8]) -> bool {
    match value {
        Value::Bool(v) => v.encode(endianness, out),
        Value::Int8(v) => v.encode(endianness, out),
        Value::Int16(v) => v.encode(endianness, out),
        Value::Int32(v) => v.encode(endianness, out),
        Value::Int64(v) => v.encode(endianness, out),
        Value::UInt8(v) => v.encode(endianness, out),
        Value::UInt16(v) => v.encode(endianness, out),
        Value::UInt32(v) => v.encode(endianness, out),
        Value::UInt64(v) => v.encode(endianness, out),
        Value::Float32(v) => v.encode(endianness, out),
        Value::Float64(v) => v.encode(endianness, out),
        _ => return false,
    }
    true
}

/// `[crc32]?[byteCount][bytes]`
fn encode_content(item_type: ItemType, content: &[u8], endianness: Endianness, out: &mut [u8]) {
    let mut pos = 0;
    if item_type.content_prefix() == 8 {
        crc32(content).encode(endianness, &mut out[0..4]);
        pos = 4;
    }
    (content.len() as u32).encode(endianness, &mut out[pos..pos + 4]);
    pos += 4;
    out[pos..pos + content.len()].copy_from_slice(content);
}

/// Write the value field of a large type into `out`
fn encode_value_field(value: &Value, endianness: Endianness, out: &mut [u8]) -> Result<()> {
    if encode_scalar(value, endianness, out) {
        return Ok(());
    }
    if let Some(content) = value.content_bytes() {
        encode_content(value.item_type(), content, endianness, out);
        return Ok(());
    }
    match value {
        Value::Array(array) => encode_array_field(array, endianness, out),
        Value::Dictionary(entries) => {
            let mut pos = 0;
            for (name, child) in entries {
                let field = NameField::new(name.as_str())?;
                let bytes = encode_item(child, Some(&field), 0, endianness)?;
                out[pos..pos + bytes.len()].copy_from_slice(&bytes);
                pos += bytes.len();
            }
            Ok(())
        }
        Value::Sequence(entries) => {
            let mut pos = 0;
            for (name, child) in entries {
                let field = NameField::optional(name.as_deref())?;
                let bytes = encode_item(child, field.as_ref(), 0, endianness)?;
                out[pos..pos + bytes.len()].copy_from_slice(&bytes);
                pos += bytes.len();
            }
            Ok(())
        }
        Value::Table(table) => encode_table_field(table, endianness, out),
        _ => Ok(()),
    }
}

fn encode_array_field(array: &ArrayValue, endianness: Endianness, out: &mut [u8]) -> Result<()> {
    let stride = array_stride(array)?;
    out[ARRAY_ELEMENT_TYPE_OFFSET] = array.element_type as u8;
    (stride as u32).encode(endianness, &mut out[ARRAY_ELEMENT_BYTE_COUNT_OFFSET..]);
    for (i, element) in array.elements.iter().enumerate() {
        let start = ARRAY_ELEMENTS_OFFSET + i * stride;
        let bytes = encode_element(element, array.element_type, stride, endianness)?;
        out[start..start + stride].copy_from_slice(&bytes);
    }
    Ok(())
}

fn encode_table_field(table: &TableValue, endianness: Endianness, out: &mut [u8]) -> Result<()> {
    let spec = TableSpecification::from_value(table)?;
    spec.write(table.rows.len(), endianness, out);
    let rows_offset = spec.rows_offset();
    let row_byte_count = spec.row_byte_count();
    for (r, row) in table.rows.iter().enumerate() {
        for (column, cell) in spec.columns.iter().zip(row) {
            let start = rows_offset + r * row_byte_count + column.value_offset;
            let bytes = encode_element(cell, column.value_type, column.value_byte_count, endianness)?;
            out[start..start + column.value_byte_count].copy_from_slice(&bytes);
        }
    }
    Ok(())
}

/// Encode an array element or table cell into a slot of exactly `slot` bytes
pub(crate) fn encode_element(
    value: &Value,
    element_type: ItemType,
    slot: usize,
    endianness: Endianness,
) -> Result<Vec<u8>> {
    let minimum = min_element_byte_count(element_type, Some(value))?;
    if minimum > slot {
        return Err(BrbonError::FixedSizeTooSmall {
            requested: slot,
            minimum,
        });
    }
    let mut out = vec![0u8; slot];
    if encode_scalar(value, endianness, &mut out) {
        return Ok(out);
    }
    if let Some(content) = value.content_bytes() {
        encode_content(element_type, content, endianness, &mut out);
        return Ok(out);
    }
    let item = encode_item(value, None, slot, endianness)?;
    out.copy_from_slice(&item);
    Ok(out)
}

/// Materialize the item at `offset` together with its name
pub(crate) fn decode_item(
    bytes: &[u8],
    offset: usize,
    endianness: Endianness,
) -> Result<(Option<String>, Value)> {
    let header = ItemHeader::decode(bytes, offset, endianness)?;
    let name = if header.name_field_byte_count > 0 {
        let start = offset + ITEM_NAME_FIELD_OFFSET;
        let end = start + header.name_field_byte_count as usize;
        let field = bytes
            .get(start..end)
            .ok_or_else(|| BrbonError::malformed(offset, "name field past end of buffer"))?;
        Some(decode_name(field, start)?)
    } else {
        None
    };
    Ok((name, decode_value(bytes, offset, &header, endianness)?))
}

/// Materialize the value of the item at `offset`
pub(crate) fn decode_value(
    bytes: &[u8],
    offset: usize,
    header: &ItemHeader,
    endianness: Endianness,
) -> Result<Value> {
    let slot = offset + ITEM_COUNT_VALUE_OFFSET;
    let vf = offset + header.value_field_offset();
    Ok(match header.item_type {
        ItemType::Null => Value::Null,
        ItemType::Bool => Value::Bool(read_at(bytes, slot, endianness)?),
        ItemType::Int8 => Value::Int8(read_at(bytes, slot, endianness)?),
        ItemType::Int16 => Value::Int16(read_at(bytes, slot, endianness)?),
        ItemType::Int32 => Value::Int32(read_at(bytes, slot, endianness)?),
        ItemType::UInt8 => Value::UInt8(read_at(bytes, slot, endianness)?),
        ItemType::UInt16 => Value::UInt16(read_at(bytes, slot, endianness)?),
        ItemType::UInt32 => Value::UInt32(read_at(bytes, slot, endianness)?),
        ItemType::Float32 => Value::Float32(read_at(bytes, slot, endianness)?),
        ItemType::Int64
        | ItemType::UInt64
        | ItemType::Float64
        | ItemType::String
        | ItemType::CrcString
        | ItemType::Binary
        | ItemType::CrcBinary => decode_element(bytes, vf, header.item_type, endianness)?,
        ItemType::Array => {
            let element_type =
                ItemType::parse(read_at::<u8>(bytes, vf + ARRAY_ELEMENT_TYPE_OFFSET, endianness)?, vf)?;
            let stride =
                read_at::<u32>(bytes, vf + ARRAY_ELEMENT_BYTE_COUNT_OFFSET, endianness)? as usize;
            let mut elements = Vec::with_capacity(header.count_value as usize);
            for i in 0..header.count_value as usize {
                let start = vf + ARRAY_ELEMENTS_OFFSET + i * stride;
                elements.push(decode_element(bytes, start, element_type, endianness)?);
            }
            Value::Array(ArrayValue {
                element_type,
                element_byte_count: Some(stride),
                elements,
            })
        }
        ItemType::Dictionary => {
            let mut entries = Vec::with_capacity(header.count_value as usize);
            for child in child_offsets(bytes, offset, header, endianness)? {
                let (name, value) = decode_item(bytes, child, endianness)?;
                let name =
                    name.ok_or_else(|| BrbonError::malformed(child, "unnamed dictionary entry"))?;
                entries.push((name, value));
            }
            Value::Dictionary(entries)
        }
        ItemType::Sequence => {
            let mut entries = Vec::with_capacity(header.count_value as usize);
            for child in child_offsets(bytes, offset, header, endianness)? {
                entries.push(decode_item(bytes, child, endianness)?);
            }
            Value::Sequence(entries)
        }
        ItemType::Table => {
            let (spec, row_count) = TableSpecification::read(bytes, vf, endianness)?;
            let rows_start = vf + spec.rows_offset();
            let mut rows = Vec::with_capacity(row_count);
            for r in 0..row_count {
                let row_start = rows_start + r * spec.row_byte_count();
                let mut row = Vec::with_capacity(spec.columns.len());
                for column in &spec.columns {
                    row.push(decode_element(
                        bytes,
                        row_start + column.value_offset,
                        column.value_type,
                        endianness,
                    )?);
                }
                rows.push(row);
            }
            Value::Table(spec.to_value(rows))
        }
    })
}

/// Materialize an array element, table cell or large-type value field at `offset`
pub(crate) fn decode_element(
    bytes: &[u8],
    offset: usize,
    element_type: ItemType,
    endianness: Endianness,
) -> Result<Value> {
    Ok(match element_type {
        ItemType::Null => Value::Null,
        ItemType::Bool => Value::Bool(read_at(bytes, offset, endianness)?),
        ItemType::Int8 => Value::Int8(read_at(bytes, offset, endianness)?),
        ItemType::Int16 => Value::Int16(read_at(bytes, offset, endianness)?),
        ItemType::Int32 => Value::Int32(read_at(bytes, offset, endianness)?),
        ItemType::Int64 => Value::Int64(read_at(bytes, offset, endianness)?),
        ItemType::UInt8 => Value::UInt8(read_at(bytes, offset, endianness)?),
        ItemType::UInt16 => Value::UInt16(read_at(bytes, offset, endianness)?),
        ItemType::UInt32 => Value::UInt32(read_at(bytes, offset, endianness)?),
        ItemType::UInt64 => Value::UInt64(read_at(bytes, offset, endianness)?),
        ItemType::Float32 => Value::Float32(read_at(bytes, offset, endianness)?),
        ItemType::Float64 => Value::Float64(read_at(bytes, offset, endianness)?),
        ItemType::String | ItemType::CrcString => {
            let content = decode_content(bytes, offset, element_type, endianness)?;
            let s = String::from_utf8(content.to_vec())
                .map_err(|_| BrbonError::malformed(offset, "string is not valid UTF-8"))?;
            if element_type == ItemType::String {
                Value::String(s)
            } else {
                Value::CrcString(s)
            }
        }
        ItemType::Binary => Value::Binary(decode_content(bytes, offset, element_type, endianness)?.to_vec()),
        ItemType::CrcBinary => {
            Value::CrcBinary(decode_content(bytes, offset, element_type, endianness)?.to_vec())
        }
        ItemType::Array | ItemType::Dictionary | ItemType::Sequence | ItemType::Table => {
            decode_item(bytes, offset, endianness)?.1
        }
    })
}

/// Content bytes of a string/binary encoding starting at `offset`
pub(crate) fn decode_content(
    bytes: &[u8],
    offset: usize,
    item_type: ItemType,
    endianness: Endianness,
) -> Result<&[u8]> {
    let prefix = item_type.content_prefix();
    let len = read_at::<u32>(bytes, offset + prefix - 4, endianness)? as usize;
    bytes
        .get(offset + prefix..offset + prefix + len)
        .ok_or_else(|| BrbonError::malformed(offset, "content length exceeds buffer"))
}

/// Offsets of the children of a dictionary or sequence
pub(crate) fn child_offsets(
    bytes: &[u8],
    offset: usize,
    header: &ItemHeader,
    endianness: Endianness,
) -> Result<Vec<usize>> {
    let mut offsets = Vec::with_capacity(header.count_value as usize);
    let mut pos = offset + header.value_field_offset();
    let end = offset + header.item_byte_count as usize;
    for _ in 0..header.count_value {
        let size = read_at::<u32>(bytes, pos + crate::layout::ITEM_BYTE_COUNT_OFFSET, endianness)? as usize;
        if size < ITEM_HEADER_BYTE_COUNT || pos + size > end {
            return Err(BrbonError::malformed(pos, "child item exceeds its container"));
        }
        offsets.push(pos);
        pos += size;
    }
    Ok(offsets)
}
