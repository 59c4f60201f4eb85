//! Fixed-width scalar encoding
//!
//! Every scalar item type reads and writes a fixed number of bytes at an
//! offset, in the byte order configured for the whole buffer.

use serde::{Deserialize, Serialize};

/// Byte order used for every multi-byte field in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Encode/decode capability for a fixed-width scalar
pub trait Codec: Sized + Copy {
    /// Number of bytes the encoded value occupies
    const BYTE_COUNT: usize;

    /// Write the value into the first `BYTE_COUNT` bytes of `out`
    fn encode(self, endianness: Endianness, out: &mut [u8]);

    /// Read the value from the first `BYTE_COUNT` bytes of `bytes`
    fn decode(bytes: &[u8], endianness: Endianness) -> Self;
}

macro_rules! impl_codec {
    ($($ty:ty => $n:expr),* $(,)?) => {
        $(
            impl Codec for $ty {
                const BYTE_COUNT: usize = $n;

                #[inline]
                fn encode(self, endianness: Endianness, out: &mut [u8]) {
                    let bytes = match endianness {
                        Endianness::Little => self.to_le_bytes(),
                        Endianness::Big => self.to_be_bytes(),
                    };
                    out[..$n].copy_from_slice(&bytes);
                }

                #[inline]
                fn decode(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut raw = [0u8; $n];
                    raw.copy_from_slice(&bytes[..$n]);
                    match endianness {
                        Endianness::Little => <$ty>::from_le_bytes(raw),
                        Endianness::Big => <$ty>::from_be_bytes(raw),
                    }
                }
            }
        )*
    };
}

impl_codec! {
    i8 => 1, i16 => 2, i32 => 4, i64 => 8,
    u8 => 1, u16 => 2, u32 => 4, u64 => 8,
    f32 => 4, f64 => 8,
}

impl Codec for bool {
    const BYTE_COUNT: usize = 1;

    #[inline]
    fn encode(self, _endianness: Endianness, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    #[inline]
    fn decode(bytes: &[u8], _endianness: Endianness) -> Self {
        bytes[0] != 0
    }
}

/// Encode into a fresh vector
#[cfg(test)]
fn encode_to_vec<T: Codec>(value: T, endianness: Endianness) -> Vec<u8> {
    let mut out = vec![0u8; T::BYTE_COUNT];
    value.encode(endianness, &mut out);
    out
}
