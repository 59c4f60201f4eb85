//! Table engine
//!
//! A table's value field starts with its specification (row and column
//! counts, rows offset, row stride, column descriptors and column names)
//! followed by fixed-stride rows. Columns are packed in descriptor order and
//! every column width is a multiple of 8. Adding or removing a column
//! rewrites the specification and moves every row; row edits only move rows.

use crate::codec::{Codec, Endianness};
use crate::crc::crc16;
use crate::error::{BrbonError, Result};
use crate::item::{check_nesting, encode_element, min_element_byte_count};
use crate::item_type::ItemType;
use crate::layout::{
    read_at, round_up8, ColumnDescriptor, COLUMN_DESCRIPTOR_BYTE_COUNT,
    TABLE_COLUMN_COUNT_OFFSET, TABLE_COLUMN_DESCRIPTORS_OFFSET, TABLE_ROWS_OFFSET_OFFSET,
    TABLE_ROW_BYTE_COUNT_OFFSET, TABLE_ROW_COUNT_OFFSET,
};
use crate::manager::ItemManager;
use crate::name::NameField;
use crate::portal::{Portal, PortalKey};
use crate::value::{ColumnSpec, TableValue, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub name: NameField,
    pub value_type: ItemType,
    /// Relative to the row start
    pub value_offset: usize,
    pub value_byte_count: usize,
}

/// In-memory form of a table's specification region
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TableSpecification {
    pub columns: Vec<Column>,
}

/// Width of a column able to hold `values`, at least `requested` when given
pub(crate) fn column_width<'a>(
    value_type: ItemType,
    requested: Option<usize>,
    values: impl Iterator<Item = &'a Value>,
) -> Result<usize> {
    let mut minimum = round_up8(min_element_byte_count(value_type, None)?);
    for value in values {
        minimum = minimum.max(round_up8(min_element_byte_count(value_type, Some(value))?));
    }
    match requested {
        Some(requested) => {
            let requested = round_up8(requested);
            if requested < minimum {
                return Err(BrbonError::FixedSizeTooSmall { requested, minimum });
            }
            Ok(requested)
        }
        None => Ok(minimum),
    }
}

impl TableSpecification {
    /// Validate and lay out the columns of a table value
    pub fn from_value(table: &TableValue) -> Result<Self> {
        let column_count = table.columns.len();
        if let Some(row) = table.rows.iter().find(|row| row.len() != column_count) {
            return Err(BrbonError::IndexOutOfBounds {
                index: row.len(),
                count: column_count,
            });
        }
        let mut spec = TableSpecification::default();
        for (c, column) in table.columns.iter().enumerate() {
            let width = column_width(
                column.value_type,
                column.value_byte_count,
                table.rows.iter().map(|row| &row[c]),
            )?;
            spec.push(NameField::new(column.name.as_str())?, column.value_type, width)?;
        }
        Ok(spec)
    }

    /// Append a column at the end of every row
    pub fn push(&mut self, name: NameField, value_type: ItemType, value_byte_count: usize) -> Result<()> {
        if self.column_index(name.as_str()).is_some() {
            return Err(BrbonError::InvalidName(format!(
                "duplicate column name '{}'",
                name.as_str()
            )));
        }
        let value_offset = self.row_byte_count();
        self.columns.push(Column {
            name,
            value_type,
            value_offset,
            value_byte_count,
        });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Column {
        let removed = self.columns.remove(index);
        self.relayout();
        removed
    }

    pub fn widen(&mut self, index: usize, value_byte_count: usize) {
        self.columns[index].value_byte_count = value_byte_count;
        self.relayout();
    }

    fn relayout(&mut self) {
        let mut offset = 0;
        for column in &mut self.columns {
            column.value_offset = offset;
            offset += column.value_byte_count;
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let crc = crc16(name.as_bytes());
        self.columns
            .iter()
            .position(|c| c.name.crc() == crc && c.name.as_str() == name)
    }

    fn names_byte_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| round_up8(c.name.as_str().len()))
            .sum()
    }

    /// Start of the first row, relative to the value field
    pub fn rows_offset(&self) -> usize {
        TABLE_COLUMN_DESCRIPTORS_OFFSET
            + self.columns.len() * COLUMN_DESCRIPTOR_BYTE_COUNT
            + self.names_byte_count()
    }

    pub fn row_byte_count(&self) -> usize {
        self.columns.iter().map(|c| c.value_byte_count).sum()
    }

    pub fn value_byte_count(&self, row_count: usize) -> usize {
        self.rows_offset() + row_count * self.row_byte_count()
    }

    /// Encoded cells of a fresh row
    pub fn default_row(&self, endianness: Endianness) -> Result<Vec<u8>> {
        let mut row = vec![0u8; self.row_byte_count()];
        for column in &self.columns {
            let cell = encode_element(
                &Value::default_for(column.value_type),
                column.value_type,
                column.value_byte_count,
                endianness,
            )?;
            row[column.value_offset..column.value_offset + column.value_byte_count]
                .copy_from_slice(&cell);
        }
        Ok(row)
    }

    /// Write the specification region; `out` must be `rows_offset()` long
    pub fn write(&self, row_count: usize, endianness: Endianness, out: &mut [u8]) {
        out[..self.rows_offset()].fill(0);
        (row_count as u32).encode(endianness, &mut out[TABLE_ROW_COUNT_OFFSET..]);
        (self.columns.len() as u32).encode(endianness, &mut out[TABLE_COLUMN_COUNT_OFFSET..]);
        (self.rows_offset() as u32).encode(endianness, &mut out[TABLE_ROWS_OFFSET_OFFSET..]);
        (self.row_byte_count() as u32).encode(endianness, &mut out[TABLE_ROW_BYTE_COUNT_OFFSET..]);

        let mut name_offset =
            TABLE_COLUMN_DESCRIPTORS_OFFSET + self.columns.len() * COLUMN_DESCRIPTOR_BYTE_COUNT;
        for (c, column) in self.columns.iter().enumerate() {
            let name = column.name.as_str().as_bytes();
            let descriptor = ColumnDescriptor {
                name_crc: column.name.crc(),
                name_byte_count: name.len() as u8,
                value_type: column.value_type,
                name_offset: name_offset as u32,
                value_offset: column.value_offset as u32,
                value_byte_count: column.value_byte_count as u32,
            };
            let at = TABLE_COLUMN_DESCRIPTORS_OFFSET + c * COLUMN_DESCRIPTOR_BYTE_COUNT;
            descriptor.encode(endianness, &mut out[at..at + COLUMN_DESCRIPTOR_BYTE_COUNT]);
            out[name_offset..name_offset + name.len()].copy_from_slice(name);
            name_offset += round_up8(name.len());
        }
    }

    /// Read and check the specification of the table whose value field starts at `value_field`
    ///
    /// Returns the specification and the row count.
    pub fn read(bytes: &[u8], value_field: usize, endianness: Endianness) -> Result<(Self, usize)> {
        let row_count = read_at::<u32>(bytes, value_field + TABLE_ROW_COUNT_OFFSET, endianness)? as usize;
        let column_count =
            read_at::<u32>(bytes, value_field + TABLE_COLUMN_COUNT_OFFSET, endianness)? as usize;
        let rows_offset = read_at::<u32>(bytes, value_field + TABLE_ROWS_OFFSET_OFFSET, endianness)? as usize;
        let row_byte_count =
            read_at::<u32>(bytes, value_field + TABLE_ROW_BYTE_COUNT_OFFSET, endianness)? as usize;

        if column_count > bytes.len() / COLUMN_DESCRIPTOR_BYTE_COUNT {
            return Err(BrbonError::malformed(value_field, "column count exceeds buffer"));
        }

        let mut spec = TableSpecification::default();
        let mut expected_name_offset =
            TABLE_COLUMN_DESCRIPTORS_OFFSET + column_count * COLUMN_DESCRIPTOR_BYTE_COUNT;
        for c in 0..column_count {
            let at = value_field + TABLE_COLUMN_DESCRIPTORS_OFFSET + c * COLUMN_DESCRIPTOR_BYTE_COUNT;
            let descriptor = ColumnDescriptor::decode(bytes, at, endianness)?;
            if descriptor.name_offset as usize != expected_name_offset {
                return Err(BrbonError::malformed(at, "column name offset out of place"));
            }
            let name_start = value_field + expected_name_offset;
            let raw = bytes
                .get(name_start..name_start + descriptor.name_byte_count as usize)
                .ok_or_else(|| BrbonError::malformed(at, "column name past end of buffer"))?;
            let name = std::str::from_utf8(raw)
                .map_err(|_| BrbonError::malformed(name_start, "column name is not valid UTF-8"))?;
            let name = NameField::new(name)
                .map_err(|err| BrbonError::malformed(name_start, format!("bad column name: {err}")))?;
            if name.crc() != descriptor.name_crc {
                return Err(BrbonError::malformed(at, "column name hash mismatch"));
            }
            if descriptor.value_type == ItemType::Null {
                return Err(BrbonError::malformed(at, "null column type"));
            }
            let width = descriptor.value_byte_count as usize;
            let minimum = round_up8(min_element_byte_count(descriptor.value_type, None)?);
            if width % 8 != 0 || width < minimum {
                return Err(BrbonError::malformed(at, format!("column width {width} is invalid")));
            }
            if descriptor.value_offset as usize != spec.row_byte_count() {
                return Err(BrbonError::malformed(at, "column value offset out of place"));
            }
            spec.push(name, descriptor.value_type, width)
                .map_err(|err| BrbonError::malformed(at, err.to_string()))?;
            expected_name_offset += round_up8(descriptor.name_byte_count as usize);
        }

        if rows_offset != spec.rows_offset() {
            return Err(BrbonError::malformed(value_field, "rows offset does not follow the column names"));
        }
        if row_byte_count != spec.row_byte_count() {
            return Err(BrbonError::malformed(value_field, "row byte count does not match the columns"));
        }
        Ok((spec, row_count))
    }

    pub fn to_value(&self, rows: Vec<Vec<Value>>) -> TableValue {
        TableValue {
            columns: self
                .columns
                .iter()
                .map(|c| ColumnSpec {
                    name: c.name.as_str().to_string(),
                    value_type: c.value_type,
                    value_byte_count: Some(c.value_byte_count),
                })
                .collect(),
            rows,
        }
    }
}

impl ItemManager {
    /// Append a column; existing rows get the type's zero value
    ///
    /// # Errors
    ///
    /// `InvalidName` for a duplicate name, `TypeMismatch` for a null column,
    /// `FixedSizeTooSmall` when the requested width is below the type's minimum.
    pub fn add_column(&mut self, table: &Portal, column: ColumnSpec) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        let (old, rows) = self.table_specification(offset)?;
        let width = column_width(column.value_type, column.value_byte_count, std::iter::empty())?;
        let default_value = Value::default_for(column.value_type);
        if column.value_type.is_container() {
            check_nesting(self.depth_of(offset)? + 1, &default_value)?;
        }
        let mut new = old.clone();
        new.push(NameField::new(column.name.as_str())?, column.value_type, width)?;
        let default_cell = encode_element(
            &default_value,
            column.value_type,
            width,
            self.endianness(),
        )?;

        let offset = self.ensure_value_capacity(offset, new.value_byte_count(rows))?;
        let vf = self.value_field(offset)?;
        let (old_rows, old_stride) = (vf + old.rows_offset(), old.row_byte_count());
        let (new_rows, new_stride) = (vf + new.rows_offset(), new.row_byte_count());
        for row in (0..rows).rev() {
            let dst = new_rows + row * new_stride;
            self.move_block(dst, old_rows + row * old_stride, old_stride, 0)?;
            self.buffer_mut().write_bytes(dst + old_stride, &default_cell)?;
        }
        self.write_specification(offset, &new, rows)?;
        self.relink(offset)?;
        debug!(
            "Added column '{}' ({}) to table at {:#x}: row stride {} -> {}",
            column.name, column.value_type, offset, old_stride, new_stride
        );
        Ok(())
    }

    /// Remove a column and close the gap in every row
    ///
    /// The table item keeps its byte count.
    pub fn remove_column(&mut self, table: &Portal, name: &str) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        let (old, rows) = self.table_specification(offset)?;
        let index = old
            .column_index(name)
            .ok_or_else(|| BrbonError::ColumnNotFound(name.to_string()))?;
        let mut new = old.clone();
        let removed = new.remove(index);

        let vf = self.value_field(offset)?;
        let (old_rows, old_stride) = (vf + old.rows_offset(), old.row_byte_count());
        let (new_rows, new_stride) = (vf + new.rows_offset(), new.row_byte_count());
        let cut = removed.value_offset;
        let width = removed.value_byte_count;

        for row in 0..rows {
            self.invalidate_item(old_rows + row * old_stride + cut, width);
        }
        self.portals_mut().remove_column(offset, index);

        for row in 0..rows {
            let src = old_rows + row * old_stride;
            let dst = new_rows + row * new_stride;
            self.move_block(dst, src, cut, 0)?;
            self.move_block(dst + cut, src + cut + width, old_stride - cut - width, 0)?;
        }
        let new_end = vf + new.value_byte_count(rows);
        let old_end = vf + old.value_byte_count(rows);
        self.buffer_mut().zero(new_end, old_end - new_end)?;
        self.write_specification(offset, &new, rows)?;
        self.relink(offset)?;
        debug!(
            "Removed column '{}' from table at {:#x}: row stride {} -> {}",
            name, offset, old_stride, new_stride
        );
        Ok(())
    }

    /// Append `count` rows of zero values
    pub fn add_rows(&mut self, table: &Portal, count: usize) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        let (_, rows) = self.table_specification(offset)?;
        self.insert_rows_at(offset, rows, count)
    }

    /// Insert `count` rows of zero values before row `index`
    pub fn insert_rows(&mut self, table: &Portal, index: usize, count: usize) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        self.insert_rows_at(offset, index, count)
    }

    fn insert_rows_at(&mut self, table: usize, index: usize, count: usize) -> Result<()> {
        let (spec, rows) = self.table_specification(table)?;
        if index > rows {
            return Err(BrbonError::IndexOutOfBounds { index, count: rows });
        }
        if count == 0 {
            return Ok(());
        }
        if spec.columns.iter().any(|c| c.value_type.is_container()) {
            check_nesting(self.depth_of(table)? + 1, &Value::Null)?;
        }
        let row = spec.default_row(self.endianness())?;
        let table = self.ensure_value_capacity(table, spec.value_byte_count(rows + count))?;

        let vf = self.value_field(table)?;
        let start = vf + spec.rows_offset();
        let stride = spec.row_byte_count();
        if index < rows {
            self.move_block(
                start + (index + count) * stride,
                start + index * stride,
                (rows - index) * stride,
                0,
            )?;
            self.portals_mut().shift_indices(table, index, count as isize);
        }
        for r in index..index + count {
            self.buffer_mut().write_bytes(start + r * stride, &row)?;
        }
        self.buffer_mut()
            .write::<u32>(vf + TABLE_ROW_COUNT_OFFSET, (rows + count) as u32)?;
        self.relink(table)?;
        debug!("Inserted {} rows at {} in table at {:#x}", count, index, table);
        Ok(())
    }

    /// Remove row `index`, shifting later rows down
    pub fn remove_row(&mut self, table: &Portal, index: usize) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        let (spec, rows) = self.table_specification(offset)?;
        if index >= rows {
            return Err(BrbonError::IndexOutOfBounds { index, count: rows });
        }
        let vf = self.value_field(offset)?;
        let start = vf + spec.rows_offset();
        let stride = spec.row_byte_count();
        let at = start + index * stride;

        self.move_block(at, at + stride, (rows - index - 1) * stride, stride)?;
        self.buffer_mut().zero(start + (rows - 1) * stride, stride)?;
        self.portals_mut().shift_indices(offset, index, -1);
        self.buffer_mut()
            .write::<u32>(vf + TABLE_ROW_COUNT_OFFSET, (rows - 1) as u32)?;
        self.relink(offset)
    }

    /// Widen column `name` to at least `byte_count` bytes
    pub fn increase_column_value_byte_count(&mut self, table: &Portal, name: &str, byte_count: usize) -> Result<()> {
        let offset = self.container(table, ItemType::Table)?;
        let (spec, _) = self.table_specification(offset)?;
        let index = spec
            .column_index(name)
            .ok_or_else(|| BrbonError::ColumnNotFound(name.to_string()))?;
        self.widen_column(offset, index, byte_count)?;
        Ok(())
    }

    /// Widen column `index` in every row; returns the table's offset afterwards
    pub(crate) fn widen_column(&mut self, table: usize, index: usize, byte_count: usize) -> Result<usize> {
        let width = round_up8(byte_count);
        let (old, rows) = self.table_specification(table)?;
        let column = old.columns[index].clone();
        if width <= column.value_byte_count {
            return Ok(table);
        }
        let mut new = old.clone();
        new.widen(index, width);

        let table = self.ensure_value_capacity(table, new.value_byte_count(rows))?;
        let start = self.value_field(table)? + old.rows_offset();
        let (old_stride, new_stride) = (old.row_byte_count(), new.row_byte_count());
        let end = column.value_offset + column.value_byte_count;
        let delta = width - column.value_byte_count;
        for row in (0..rows).rev() {
            let src = start + row * old_stride;
            let dst = start + row * new_stride;
            self.move_block(dst + end + delta, src + end, old_stride - end, 0)?;
            self.move_block(dst, src, end, 0)?;
            self.buffer_mut().zero(dst + end, delta)?;
            if column.value_type.is_container() {
                self.set_item_byte_count(dst + column.value_offset, width)?;
            }
        }
        self.write_specification(table, &new, rows)?;
        self.relink(table)?;
        debug!(
            "Widened column '{}' of table at {:#x}: {} -> {} bytes",
            column.name.as_str(),
            table,
            column.value_byte_count,
            width
        );
        Ok(table)
    }

    fn write_specification(&mut self, table: usize, spec: &TableSpecification, rows: usize) -> Result<()> {
        let mut region = vec![0u8; spec.rows_offset()];
        spec.write(rows, self.endianness(), &mut region);
        let vf = self.value_field(table)?;
        self.buffer_mut().write_bytes(vf, &region)
    }

    /// Overwrite a cell; string and binary columns widen to fit
    pub(crate) fn set_cell(&mut self, table: usize, row: usize, column: usize, value: Value) -> Result<()> {
        let (spec, _) = self.table_specification(table)?;
        let value_type = spec.columns[column].value_type;
        let minimum = min_element_byte_count(value_type, Some(&value))?;
        if value_type.is_container() {
            let offset = self.cell_offset(table, row, column)?;
            return self.replace_item(offset, value);
        }

        let width = spec.columns[column].value_byte_count.max(round_up8(minimum));
        let bytes = encode_element(&value, value_type, width, self.endianness())?;
        let table = self.widen_column(table, column, width)?;
        let offset = self.cell_offset(table, row, column)?;
        self.buffer_mut().write_bytes(offset, &bytes)
    }

    /// Portal for a cell; container cells get item portals
    pub fn cell(&self, table: &Portal, row: usize, column: usize) -> Result<Portal> {
        let offset = self.container(table, ItemType::Table)?;
        let (spec, rows) = self.table_specification(offset)?;
        if row >= rows {
            return Err(BrbonError::IndexOutOfBounds { index: row, count: rows });
        }
        let value_type = spec
            .columns
            .get(column)
            .ok_or(BrbonError::IndexOutOfBounds {
                index: column,
                count: spec.columns.len(),
            })?
            .value_type;
        if value_type.is_container() {
            Ok(self.portal(PortalKey::item(self.cell_offset(offset, row, column)?)))
        } else {
            Ok(self.portal(PortalKey::cell(offset, row, column)))
        }
    }

    /// Portal for the cell of column `name` in `row`
    pub fn cell_by_name(&self, table: &Portal, row: usize, name: &str) -> Result<Portal> {
        let offset = self.container(table, ItemType::Table)?;
        let (spec, _) = self.table_specification(offset)?;
        let column = spec
            .column_index(name)
            .ok_or_else(|| BrbonError::ColumnNotFound(name.to_string()))?;
        self.cell(table, row, column)
    }

    pub fn column_index(&self, table: &Portal, name: &str) -> Option<usize> {
        let result = self
            .container(table, ItemType::Table)
            .and_then(|offset| self.table_specification(offset));
        self.lenient(table, result)?.0.column_index(name)
    }

    /// Column layout, widths included
    pub fn columns(&self, table: &Portal) -> Option<Vec<ColumnSpec>> {
        let result = self
            .container(table, ItemType::Table)
            .and_then(|offset| self.table_specification(offset));
        let (spec, _) = self.lenient(table, result)?;
        Some(spec.to_value(Vec::new()).columns)
    }

    pub fn row_count(&self, table: &Portal) -> Option<usize> {
        let result = self
            .container(table, ItemType::Table)
            .and_then(|offset| self.table_specification(offset));
        self.lenient(table, result).map(|(_, rows)| rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerConfig;

    fn people() -> ItemManager {
        let table = TableValue::new(vec![
            ColumnSpec::new("id", ItemType::UInt32),
            ColumnSpec::new("name", ItemType::String).with_byte_count(32),
        ]);
        ItemManager::with_root(table, None, ManagerConfig::default()).unwrap()
    }

    #[test]
    fn test_specification_layout() {
        let spec = TableSpecification::from_value(&TableValue::new(vec![
            ColumnSpec::new("id", ItemType::UInt32),
            ColumnSpec::new("a_long_column_name", ItemType::Int64),
        ]))
        .unwrap();
        assert_eq!(spec.columns[0].value_byte_count, 8);
        assert_eq!(spec.columns[1].value_offset, 8);
        // 16 + 2 descriptors + names padded to 8 and 24
        assert_eq!(spec.rows_offset(), 16 + 32 + 8 + 24);
        assert_eq!(spec.row_byte_count(), 16);

        let mut region = vec![0u8; spec.rows_offset()];
        spec.write(3, Endianness::Big, &mut region);
        let (read, rows) = TableSpecification::read(&region, 0, Endianness::Big).unwrap();
        assert_eq!(read, spec);
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_duplicate_and_null_columns() {
        let duplicate = TableValue::new(vec![
            ColumnSpec::new("a", ItemType::Bool),
            ColumnSpec::new("a", ItemType::Bool),
        ]);
        assert!(matches!(
            TableSpecification::from_value(&duplicate),
            Err(BrbonError::InvalidName(_))
        ));
        let null = TableValue::new(vec![ColumnSpec::new("n", ItemType::Null)]);
        assert!(matches!(
            TableSpecification::from_value(&null),
            Err(BrbonError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_add_rows_and_set_cells() {
        let mut m = people();
        let root = m.root();
        m.add_rows(&root, 2).unwrap();
        assert_eq!(m.row_count(&root), Some(2));

        let id = m.cell_by_name(&root, 1, "id").unwrap();
        m.set(&id, 42u32).unwrap();
        let name = m.cell(&root, 1, 1).unwrap();
        m.set(&name, "forty-two").unwrap();

        assert_eq!(m.get::<u32>(&id), Some(42));
        assert_eq!(m.get_string(&name).as_deref(), Some("forty-two"));
        let empty = m.cell(&root, 0, 1).unwrap();
        assert_eq!(m.get_string(&empty).as_deref(), Some(""));
    }

    #[test]
    fn test_wide_string_widens_column() {
        let mut m = people();
        let root = m.root();
        m.add_rows(&root, 2).unwrap();
        let id = m.cell(&root, 1, 0).unwrap();
        m.set(&id, 5u32).unwrap();

        let long = "x".repeat(40);
        let name = m.cell(&root, 0, 1).unwrap();
        m.set(&name, long.as_str()).unwrap();

        let columns = m.columns(&root).unwrap();
        assert_eq!(columns[1].value_byte_count, Some(48));
        assert_eq!(m.get_string(&name), Some(long));
        assert_eq!(m.get::<u32>(&id), Some(5));
    }

    #[test]
    fn test_remove_row_renumbers_cells() {
        let mut m = people();
        let root = m.root();
        m.add_rows(&root, 3).unwrap();
        for row in 0..3 {
            let id = m.cell(&root, row, 0).unwrap();
            m.set(&id, row as u32 * 10).unwrap();
            m.release(id);
        }
        let last = m.cell(&root, 2, 0).unwrap();
        let first = m.cell(&root, 0, 0).unwrap();
        m.remove_row(&root, 0).unwrap();

        assert!(!m.is_valid(&first));
        assert_eq!(m.get::<u32>(&last), Some(20));
        assert_eq!(m.row_count(&root), Some(2));
    }

    #[test]
    fn test_insert_rows() {
        let mut m = people();
        let root = m.root();
        m.add_rows(&root, 1).unwrap();
        let id = m.cell(&root, 0, 0).unwrap();
        m.set(&id, 1u32).unwrap();

        m.insert_rows(&root, 0, 2).unwrap();
        assert_eq!(m.row_count(&root), Some(3));
        assert_eq!(m.get::<u32>(&id), Some(1));
        let fresh = m.cell(&root, 0, 0).unwrap();
        assert_eq!(m.get::<u32>(&fresh), Some(0));
        assert!(matches!(
            m.insert_rows(&root, 4, 1),
            Err(BrbonError::IndexOutOfBounds { index: 4, count: 3 })
        ));
    }

    #[test]
    fn test_unknown_column() {
        let mut m = people();
        let root = m.root();
        assert!(matches!(
            m.remove_column(&root, "missing"),
            Err(BrbonError::ColumnNotFound(_))
        ));
        assert_eq!(m.column_index(&root, "name"), Some(1));
        assert_eq!(m.column_index(&root, "missing"), None);
    }

    #[test]
    fn test_container_cells_grow_their_column() {
        let table = TableValue::new(vec![
            ColumnSpec::new("tags", ItemType::Sequence),
            ColumnSpec::new("n", ItemType::Int8),
        ]);
        let mut m = ItemManager::with_root(table, None, ManagerConfig::default()).unwrap();
        let root = m.root();
        m.add_rows(&root, 2).unwrap();
        let n = m.cell(&root, 1, 1).unwrap();
        m.set(&n, -3i8).unwrap();

        let tags = m.cell(&root, 0, 0).unwrap();
        m.append(&tags, "red").unwrap();
        m.append(&tags, "green").unwrap();

        assert_eq!(m.count(&tags), Some(2));
        assert_eq!(m.get::<i8>(&n), Some(-3));
        let columns = m.columns(&root).unwrap();
        // sequence header plus a 24 and a 32 byte string item
        assert_eq!(columns[0].value_byte_count, Some(72));
        let other = m.cell(&root, 1, 0).unwrap();
        assert_eq!(m.count(&other), Some(0));
        assert_eq!(m.item_byte_count(&other), Some(72));
    }
}
