// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked big-endian read/write cursors.
//!
//! Every multi-byte primitive goes through `to_be_bytes`/`from_be_bytes`, the
//! single byte-order pair shared by encoder and decoder, so a buffer written
//! on any host decodes identically on any other.

use super::CodecError;

/// Generate big-endian write methods for primitive types.
///
/// Each generated method:
/// 1. Checks buffer bounds (returns `CodecError::BufferTooSmall` on overflow)
/// 2. Converts the value with `to_be_bytes()`
/// 3. Copies bytes to the buffer and advances the offset
macro_rules! impl_write_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> Result<(), CodecError> {
            self.reserve($size)?;
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&value.to_be_bytes());
            self.offset += $size;
            Ok(())
        }
    };
}

/// Generate big-endian read methods for primitive types.
///
/// Each generated method checks availability first (`CodecError::Truncated`),
/// then converts with `from_be_bytes()` and advances the offset.
macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, CodecError> {
            let bytes = self.take($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_be_bytes(raw))
        }
    };
}

/// Write cursor over a caller-provided buffer.
pub struct WriteCursor<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn reserve(&self, size: usize) -> Result<(), CodecError> {
        if self.offset + size > self.buffer.len() {
            return Err(CodecError::BufferTooSmall {
                needed: self.offset + size,
                available: self.buffer.len(),
            });
        }
        Ok(())
    }

    impl_write_be!(write_u8, u8, 1);
    impl_write_be!(write_i8, i8, 1);
    impl_write_be!(write_u16, u16, 2);
    impl_write_be!(write_i16, i16, 2);
    impl_write_be!(write_u32, u32, 4);
    impl_write_be!(write_i32, i32, 4);
    impl_write_be!(write_u64, u64, 8);
    impl_write_be!(write_i64, i64, 8);
    impl_write_be!(write_f32, f32, 4);
    impl_write_be!(write_f64, f64, 8);

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.reserve(bytes.len())?;
        self.buffer[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        Ok(())
    }

    /// Length-prefixed, NUL-terminated string; the count includes the NUL.
    pub fn write_string(&mut self, s: &str) -> Result<(), CodecError> {
        let count = s.len() + 1;
        self.write_u32(count as u32)?;
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }

    /// Length-prefixed raw bytes, no terminator.
    pub fn write_counted_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_u32(bytes.len() as u32)?;
        self.write_bytes(bytes)
    }
}

/// Read cursor over an encoded buffer.
pub struct ReadCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// Gate for every read: fails unless `count` more bytes are present.
    pub fn check_available(&self, count: usize) -> Result<(), CodecError> {
        if count > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        self.check_available(count)?;
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_i8, i8, 1);
    impl_read_be!(read_u16, u16, 2);
    impl_read_be!(read_i16, i16, 2);
    impl_read_be!(read_u32, u32, 4);
    impl_read_be!(read_i32, i32, 4);
    impl_read_be!(read_u64, u64, 8);
    impl_read_be!(read_i64, i64, 8);
    impl_read_be!(read_f32, f32, 4);
    impl_read_be!(read_f64, f64, 8);

    /// Read a length-prefixed, NUL-terminated string.
    ///
    /// The count must be in `1..=limit`, fully present, and its last byte
    /// must be the terminator.
    pub fn read_string(&mut self, limit: u32) -> Result<&'a str, CodecError> {
        let start = self.offset;
        let count = self.read_u32()?;
        if count == 0 || count > limit {
            return Err(CodecError::InvalidStringLength {
                offset: start,
                count,
            });
        }
        let bytes = self.take(count as usize)?;
        let (terminator, body) = match bytes.split_last() {
            Some((&t, body)) => (t, body),
            None => (1, bytes),
        };
        if terminator != 0 {
            return Err(CodecError::MissingTerminator { offset: start });
        }
        std::str::from_utf8(body).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    /// Read length-prefixed raw bytes (count at most `limit`).
    pub fn read_counted_bytes(&mut self, limit: u32) -> Result<&'a [u8], CodecError> {
        let start = self.offset;
        let count = self.read_u32()?;
        if count > limit {
            return Err(CodecError::BinaryTooLong {
                field: format!("@{}", start),
                len: count as u64,
            });
        }
        self.take(count as usize)
    }
}
