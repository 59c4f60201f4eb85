//! Hashed item names
//!
//! A name field is laid out as `[crc16:u16][utf8 length:u8][utf8 bytes]`
//! and zero padded to a multiple of 8 bytes. Lookups compare the hash
//! first and only fall back to a byte comparison when the hashes agree.

use crate::codec::{Codec, Endianness};
use crate::crc::crc16;
use crate::error::{BrbonError, Result};
use crate::layout::round_up8;

/// Maximum UTF-8 byte length of a name
pub const MAX_NAME_BYTES: usize = 245;

/// A validated, pre-hashed item name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameField {
    name: String,
    crc: u16,
}

impl NameField {
    /// Validate and hash a name
    ///
    /// # Errors
    ///
    /// `InvalidName` for an empty name, `NameTooLong` above 245 bytes.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BrbonError::InvalidName("name cannot be empty".to_string()));
        }
        if name.len() > MAX_NAME_BYTES {
            return Err(BrbonError::NameTooLong(name.len()));
        }
        let crc = crc16(name.as_bytes());
        Ok(NameField { name, crc })
    }

    /// Build an optional name field; `None` and `Some("")` both mean unnamed
    pub fn optional(name: Option<&str>) -> Result<Option<Self>> {
        match name {
            None | Some("") => Ok(None),
            Some(n) => Self::new(n).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Bytes occupied in the item, padding included
    pub fn byte_count(&self) -> usize {
        round_up8(3 + self.name.len())
    }

    /// Encode into `out`, which must be `byte_count()` long
    pub fn encode(&self, endianness: Endianness, out: &mut [u8]) {
        out.fill(0);
        self.crc.encode(endianness, &mut out[0..2]);
        out[2] = self.name.len() as u8;
        out[3..3 + self.name.len()].copy_from_slice(self.name.as_bytes());
    }

    /// Compare against an encoded name field
    pub fn matches(&self, field: &[u8], endianness: Endianness) -> bool {
        if field.len() < 3 || u16::decode(&field[0..2], endianness) != self.crc {
            return false;
        }
        let len = field[2] as usize;
        len == self.name.len() && field.get(3..3 + len) == Some(self.name.as_bytes())
    }
}

/// Decode the name stored in an encoded name field
pub(crate) fn decode_name(field: &[u8], offset: usize) -> Result<String> {
    if field.len() < 3 {
        return Err(BrbonError::malformed(offset, "name field shorter than 3 bytes"));
    }
    let len = field[2] as usize;
    let bytes = field
        .get(3..3 + len)
        .ok_or_else(|| BrbonError::malformed(offset, "name exceeds its name field"))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| BrbonError::malformed(offset, "name is not valid UTF-8"))
}
