use crate::error::{BrbonError, Result};

/// Item type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ItemType {
    Null = 0x01,
    Bool = 0x02,
    Int8 = 0x03,
    Int16 = 0x04,
    Int32 = 0x05,
    Int64 = 0x06,
    UInt8 = 0x07,
    UInt16 = 0x08,
    UInt32 = 0x09,
    UInt64 = 0x0A,
    Float32 = 0x0B,
    Float64 = 0x0C,
    String = 0x0D,
    CrcString = 0x0E,
    Binary = 0x0F,
    CrcBinary = 0x10,
    Array = 0x11,
    Dictionary = 0x12,
    Sequence = 0x13,
    Table = 0x14,
}

impl ItemType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x01 => ItemType::Null,
            0x02 => ItemType::Bool,
            0x03 => ItemType::Int8,
            0x04 => ItemType::Int16,
            0x05 => ItemType::Int32,
            0x06 => ItemType::Int64,
            0x07 => ItemType::UInt8,
            0x08 => ItemType::UInt16,
            0x09 => ItemType::UInt32,
            0x0A => ItemType::UInt64,
            0x0B => ItemType::Float32,
            0x0C => ItemType::Float64,
            0x0D => ItemType::String,
            0x0E => ItemType::CrcString,
            0x0F => ItemType::Binary,
            0x10 => ItemType::CrcBinary,
            0x11 => ItemType::Array,
            0x12 => ItemType::Dictionary,
            0x13 => ItemType::Sequence,
            0x14 => ItemType::Table,
            _ => return None,
        })
    }

    /// Parse a tag read from a buffer, reporting where it came from
    pub(crate) fn parse(value: u8, offset: usize) -> Result<Self> {
        Self::from_u8(value)
            .ok_or_else(|| BrbonError::malformed(offset, format!("illegal type tag {value:#04x}")))
    }

    /// Type name for error messages and the inspector
    pub fn name(self) -> &'static str {
        match self {
            ItemType::Null => "null",
            ItemType::Bool => "bool",
            ItemType::Int8 => "int8",
            ItemType::Int16 => "int16",
            ItemType::Int32 => "int32",
            ItemType::Int64 => "int64",
            ItemType::UInt8 => "uint8",
            ItemType::UInt16 => "uint16",
            ItemType::UInt32 => "uint32",
            ItemType::UInt64 => "uint64",
            ItemType::Float32 => "float32",
            ItemType::Float64 => "float64",
            ItemType::String => "string",
            ItemType::CrcString => "crcString",
            ItemType::Binary => "binary",
            ItemType::CrcBinary => "crcBinary",
            ItemType::Array => "array",
            ItemType::Dictionary => "dictionary",
            ItemType::Sequence => "sequence",
            ItemType::Table => "table",
        }
    }

    /// Value lives in the 4-byte count/value slot of the header
    pub fn is_small(self) -> bool {
        matches!(
            self,
            ItemType::Null
                | ItemType::Bool
                | ItemType::Int8
                | ItemType::Int16
                | ItemType::Int32
                | ItemType::UInt8
                | ItemType::UInt16
                | ItemType::UInt32
                | ItemType::Float32
        )
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            ItemType::Array | ItemType::Dictionary | ItemType::Sequence | ItemType::Table
        )
    }

    /// String, binary and their hashed variants
    pub fn is_variable_length(self) -> bool {
        matches!(
            self,
            ItemType::String | ItemType::CrcString | ItemType::Binary | ItemType::CrcBinary
        )
    }

    /// Byte width of fixed-width scalars, `None` for everything else
    pub fn scalar_byte_count(self) -> Option<usize> {
        match self {
            ItemType::Bool | ItemType::Int8 | ItemType::UInt8 => Some(1),
            ItemType::Int16 | ItemType::UInt16 => Some(2),
            ItemType::Int32 | ItemType::UInt32 | ItemType::Float32 => Some(4),
            ItemType::Int64 | ItemType::UInt64 | ItemType::Float64 => Some(8),
            _ => None,
        }
    }

    /// Size of the byte-count prefix (and crc) in front of variable-length content
    pub(crate) fn content_prefix(self) -> usize {
        match self {
            ItemType::CrcString | ItemType::CrcBinary => 8,
            _ => 4,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
