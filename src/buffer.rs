//! The single owned allocation
//!
//! The root item always sits at offset 0. Bytes past the root item are
//! headroom that the root can grow into before a reallocation is needed.

use crate::codec::{Codec, Endianness};
use crate::error::{BrbonError, Result};
use crate::layout::{read_at, round_up8, write_at, ItemHeader};
use tracing::{info, trace};

#[derive(Debug)]
pub(crate) struct Buffer {
    bytes: Vec<u8>,
    growth_increment: usize,
    endianness: Endianness,
}

impl Buffer {
    /// Allocate a zeroed buffer of `capacity` bytes (rounded up to 8)
    pub fn allocate(capacity: usize, growth_increment: usize, endianness: Endianness) -> Self {
        Buffer {
            bytes: vec![0u8; round_up8(capacity)],
            growth_increment,
            endianness,
        }
    }

    /// Adopt existing bytes verbatim
    pub fn from_bytes(mut bytes: Vec<u8>, growth_increment: usize, endianness: Endianness) -> Self {
        let len = round_up8(bytes.len());
        bytes.resize(len, 0);
        Buffer {
            bytes,
            growth_increment,
            endianness,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Make sure the allocation holds at least `min_size` bytes
    ///
    /// Grows to `max(min_size, len + increment)`. Handles store offsets, so
    /// the reallocation itself never invalidates or moves a portal.
    ///
    /// # Errors
    ///
    /// `InsufficientCapacity` when growth is disabled (increment 0).
    pub fn grow_to(&mut self, min_size: usize) -> Result<()> {
        let current = self.bytes.len();
        if min_size <= current {
            return Ok(());
        }
        if self.growth_increment == 0 {
            return Err(BrbonError::InsufficientCapacity {
                required: min_size,
                available: current,
            });
        }

        let new_len = round_up8(min_size.max(current + self.growth_increment));
        info!("Growing buffer: {} -> {} bytes", current, new_len);
        self.bytes.resize(new_len, 0);
        trace!("Portal keys are offsets, no rebase after reallocation");
        Ok(())
    }

    pub fn read<T: Codec>(&self, offset: usize) -> Result<T> {
        read_at(&self.bytes, offset, self.endianness)
    }

    pub fn write<T: Codec>(&mut self, offset: usize, value: T) -> Result<()> {
        write_at(&mut self.bytes, offset, value, self.endianness)
    }

    pub fn header(&self, offset: usize) -> Result<ItemHeader> {
        ItemHeader::decode(&self.bytes, offset, self.endianness)
    }

    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset + data.len();
        let len = self.bytes.len();
        self.bytes
            .get_mut(offset..end)
            .ok_or_else(|| BrbonError::malformed(offset, format!("write of {} bytes past end {len}", data.len())))?
            .copy_from_slice(data);
        Ok(())
    }

    pub fn zero(&mut self, offset: usize, count: usize) -> Result<()> {
        let len = self.bytes.len();
        self.bytes
            .get_mut(offset..offset + count)
            .ok_or_else(|| BrbonError::malformed(offset, format!("zero fill past end {len}")))?
            .fill(0);
        Ok(())
    }

    /// memmove of `count` bytes from `src` to `dst`
    pub fn copy_within(&mut self, src: usize, dst: usize, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let len = self.bytes.len();
        if src + count > len || dst + count > len {
            return Err(BrbonError::malformed(
                src.max(dst),
                format!("move of {count} bytes past end {len}"),
            ));
        }
        self.bytes.copy_within(src..src + count, dst);
        Ok(())
    }
}
