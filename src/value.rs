//! Owned values
//!
//! [`Value`] is the single sum type for everything an item can hold. It is
//! what callers hand to the container engines and what `value()` returns
//! when an item is materialized out of the buffer.

use crate::codec::Codec;
use crate::item_type::ItemType;

/// Any BRBON value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// String stored together with its CRC-32
    CrcString(String),
    Binary(Vec<u8>),
    /// Binary stored together with its CRC-32
    CrcBinary(Vec<u8>),
    Array(ArrayValue),
    /// Every entry must be named
    Dictionary(Vec<(String, Value)>),
    /// Named and unnamed entries may be mixed
    Sequence(Vec<(Option<String>, Value)>),
    Table(TableValue),
}

/// Array content: a fixed element type and uniformly sized element slots
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub element_type: ItemType,
    /// Requested element stride; the minimum required stride is used when `None`
    pub element_byte_count: Option<usize>,
    pub elements: Vec<Value>,
}

impl ArrayValue {
    pub fn new(element_type: ItemType) -> Self {
        ArrayValue {
            element_type,
            element_byte_count: None,
            elements: Vec::new(),
        }
    }

    pub fn with_elements(element_type: ItemType, elements: Vec<Value>) -> Self {
        ArrayValue {
            element_type,
            element_byte_count: None,
            elements,
        }
    }

    pub fn with_element_byte_count(mut self, byte_count: usize) -> Self {
        self.element_byte_count = Some(byte_count);
        self
    }
}

/// Column definition of a table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub value_type: ItemType,
    /// Requested width of the column in every row; rounded up to a multiple of 8
    pub value_byte_count: Option<usize>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, value_type: ItemType) -> Self {
        ColumnSpec {
            name: name.into(),
            value_type,
            value_byte_count: None,
        }
    }

    pub fn with_byte_count(mut self, byte_count: usize) -> Self {
        self.value_byte_count = Some(byte_count);
        self
    }
}

/// Table content: column layout plus row values in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableValue {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Value>>,
}

impl TableValue {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        TableValue {
            columns,
            rows: Vec::new(),
        }
    }
}

impl Value {
    pub fn item_type(&self) -> ItemType {
        match self {
            Value::Null => ItemType::Null,
            Value::Bool(_) => ItemType::Bool,
            Value::Int8(_) => ItemType::Int8,
            Value::Int16(_) => ItemType::Int16,
            Value::Int32(_) => ItemType::Int32,
            Value::Int64(_) => ItemType::Int64,
            Value::UInt8(_) => ItemType::UInt8,
            Value::UInt16(_) => ItemType::UInt16,
            Value::UInt32(_) => ItemType::UInt32,
            Value::UInt64(_) => ItemType::UInt64,
            Value::Float32(_) => ItemType::Float32,
            Value::Float64(_) => ItemType::Float64,
            Value::String(_) => ItemType::String,
            Value::CrcString(_) => ItemType::CrcString,
            Value::Binary(_) => ItemType::Binary,
            Value::CrcBinary(_) => ItemType::CrcBinary,
            Value::Array(_) => ItemType::Array,
            Value::Dictionary(_) => ItemType::Dictionary,
            Value::Sequence(_) => ItemType::Sequence,
            Value::Table(_) => ItemType::Table,
        }
    }

    /// Zero value of a type, used for fresh table cells
    pub fn default_for(item_type: ItemType) -> Value {
        match item_type {
            ItemType::Null => Value::Null,
            ItemType::Bool => Value::Bool(false),
            ItemType::Int8 => Value::Int8(0),
            ItemType::Int16 => Value::Int16(0),
            ItemType::Int32 => Value::Int32(0),
            ItemType::Int64 => Value::Int64(0),
            ItemType::UInt8 => Value::UInt8(0),
            ItemType::UInt16 => Value::UInt16(0),
            ItemType::UInt32 => Value::UInt32(0),
            ItemType::UInt64 => Value::UInt64(0),
            ItemType::Float32 => Value::Float32(0.0),
            ItemType::Float64 => Value::Float64(0.0),
            ItemType::String => Value::String(String::new()),
            ItemType::CrcString => Value::CrcString(String::new()),
            ItemType::Binary => Value::Binary(Vec::new()),
            ItemType::CrcBinary => Value::CrcBinary(Vec::new()),
            ItemType::Array => Value::Array(ArrayValue::new(ItemType::UInt8)),
            ItemType::Dictionary => Value::Dictionary(Vec::new()),
            ItemType::Sequence => Value::Sequence(Vec::new()),
            ItemType::Table => Value::Table(TableValue::default()),
        }
    }

    /// Content bytes of string/binary variants
    pub(crate) fn content_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) | Value::CrcString(s) => Some(s.as_bytes()),
            Value::Binary(b) | Value::CrcBinary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::CrcString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) | Value::CrcBinary(b) => Some(b),
            _ => None,
        }
    }

    /// JSON rendering used by the inspector
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Map, Value as Json};
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => json!(b),
            Value::Int8(n) => json!(n),
            Value::Int16(n) => json!(n),
            Value::Int32(n) => json!(n),
            Value::Int64(n) => json!(n),
            Value::UInt8(n) => json!(n),
            Value::UInt16(n) => json!(n),
            Value::UInt32(n) => json!(n),
            Value::UInt64(n) => json!(n),
            Value::Float32(n) => json!(n),
            Value::Float64(n) => json!(n),
            Value::String(s) | Value::CrcString(s) => json!(s),
            Value::Binary(b) | Value::CrcBinary(b) => {
                json!(b.iter().map(|x| format!("{x:02x}")).collect::<String>())
            }
            Value::Array(a) => Json::Array(a.elements.iter().map(Value::to_json).collect()),
            Value::Dictionary(entries) => {
                let mut map = Map::new();
                for (name, v) in entries {
                    map.insert(name.clone(), v.to_json());
                }
                Json::Object(map)
            }
            Value::Sequence(entries) => Json::Array(
                entries
                    .iter()
                    .map(|(name, v)| match name {
                        Some(n) => {
                            let mut map = Map::new();
                            map.insert(n.clone(), v.to_json());
                            Json::Object(map)
                        }
                        None => v.to_json(),
                    })
                    .collect(),
            ),
            Value::Table(t) => Json::Array(
                t.rows
                    .iter()
                    .map(|row| {
                        let mut map = Map::new();
                        for (col, v) in t.columns.iter().zip(row) {
                            map.insert(col.name.clone(), v.to_json());
                        }
                        Json::Object(map)
                    })
                    .collect(),
            ),
        }
    }
}

/// Rust scalar types with a fixed-width item representation
pub trait Scalar: Codec {
    const ITEM_TYPE: ItemType;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const ITEM_TYPE: ItemType = ItemType::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}

impl From<TableValue> for Value {
    fn from(t: TableValue) -> Self {
        Value::Table(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_types() {
        assert_eq!(Value::from(5i32).item_type(), ItemType::Int32);
        assert_eq!(Value::from("hi").item_type(), ItemType::String);
        assert_eq!(Value::from(vec![1u8]).item_type(), ItemType::Binary);
        assert_eq!(
            Value::from(ArrayValue::new(ItemType::UInt32)).item_type(),
            ItemType::Array
        );
    }

    #[test]
    fn test_scalar_bridge() {
        assert_eq!(u32::from_value(&Value::UInt32(9)), Some(9));
        assert_eq!(u32::from_value(&Value::Int32(9)), None);
        assert_eq!(7u16.into_value(), Value::UInt16(7));
    }

    #[test]
    fn test_defaults_match_type() {
        for tag in 0x01..=0x14u8 {
            let t = ItemType::from_u8(tag).unwrap();
            assert_eq!(Value::default_for(t).item_type(), t);
        }
    }

    #[test]
    fn test_json_rendering() {
        let v = Value::Dictionary(vec![
            ("a".to_string(), Value::Int32(1)),
            ("b".to_string(), Value::Binary(vec![0xAB, 0x01])),
        ]);
        assert_eq!(v.to_json(), serde_json::json!({"a": 1, "b": "ab01"}));
    }
}
