//! Bounds-checked field access over an immutable asset buffer.
//!
//! Both legacy formats address their sections by fixed or accumulated byte
//! offsets rather than by streaming, so the reader hands out typed fields at
//! absolute positions. Every access checks the requested range first; a range
//! past the end of the buffer is reported as [`DecodeError::Truncated`].

pub mod records;

use std::io::Cursor;

use binrw::{BinRead, Endian};

use crate::error::{DecodeError, Result};

pub use records::{CarHeader, FixedRecord, PolygonRecord, VertexRecord};

/// Read-only view into a byte buffer, optionally offset into a larger one.
///
/// Offsets passed to the accessors are relative to the view; offsets in
/// errors are absolute so a truncated submodel block reports its position in
/// the whole file.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset of this view inside the original buffer.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Sub-view starting at `offset` and running to the end of this view.
    pub fn window(&self, offset: usize, what: &'static str) -> Result<ByteReader<'a>> {
        let data = self.bytes(offset, self.data.len().saturating_sub(offset), what)?;
        Ok(ByteReader {
            data,
            base: self.base + offset,
        })
    }

    /// Raw byte range `offset..offset + len`.
    pub fn bytes(&self, offset: usize, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(self.truncated(offset, len, what))?;
        self.data
            .get(offset..end)
            .ok_or_else(|| self.truncated(offset, len, what))
    }

    pub fn u16_at(&self, offset: usize, what: &'static str) -> Result<u16> {
        let raw = self.bytes(offset, 2, what)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    /// One fixed-size little-endian record at `offset`.
    pub fn record<T: FixedRecord>(&self, offset: usize, what: &'static str) -> Result<T> {
        let raw = self.bytes(offset, T::SIZE, what)?;
        read_record(&mut Cursor::new(raw), what)
    }

    /// `count` consecutive records starting at `offset`.
    pub fn records<T: FixedRecord>(
        &self,
        offset: usize,
        count: usize,
        what: &'static str,
    ) -> Result<Vec<T>> {
        let len = count
            .checked_mul(T::SIZE)
            .ok_or(self.truncated(offset, usize::MAX - offset, what))?;
        let raw = self.bytes(offset, len, what)?;

        let mut cursor = Cursor::new(raw);
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(read_record(&mut cursor, what)?);
        }
        Ok(out)
    }

    fn truncated(&self, offset: usize, len: usize, what: &'static str) -> DecodeError {
        DecodeError::Truncated {
            what,
            offset: self.base.saturating_add(offset),
            len,
            buffer_len: self.base + self.data.len(),
        }
    }
}

fn read_record<T: FixedRecord>(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<T> {
    T::read_options(cursor, Endian::Little, ()).map_err(|source| DecodeError::Record { what, source })
}
