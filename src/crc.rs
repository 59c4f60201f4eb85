//! Checksums used by the format
//!
//! Names are hashed with CRC-16/ARC, the hashed string/binary variants store
//! an IEEE CRC-32 of their content.

use ::crc::{Crc, CRC_16_ARC};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// CRC-16/ARC over `data`
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// IEEE CRC-32 over `data`
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
