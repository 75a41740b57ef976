// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-describing binary encoding of a message's field list.
//!
//! All integers are big-endian.
//!
//! ```text
//! +---------+------------------------------+-----------+---------------------+
//! | version | [kind u16 + subject string]  | count i32 | field * count       |
//! |  u16=1  |   only with header encoding  |           |                     |
//! +---------+------------------------------+-----------+---------------------+
//!
//! field   := type u16 (| 0x8000 for header fields) | name string | payload
//! string  := count u32 (bytes + NUL) | bytes | 0x00
//! binary  := count u32 | bytes
//! ```
//!
//! Encoding is two-pass: [`Encoder::find_length`] sizes the output exactly,
//! then fields are written into a buffer of that size. Size ceilings are
//! enforced during the sizing pass, so an oversized message fails before any
//! byte is written.

mod cursor;
mod decoder;
mod encoder;

pub use cursor::{ReadCursor, WriteCursor};
pub use decoder::Decoder;
pub use encoder::{Encoder, FieldSelector};

use std::fmt;

/// Wire format version. Decoders reject anything else.
pub const ENCODING_VERSION: u16 = 1;
/// Upper bound on a whole encoded message.
pub const ENCODED_LIMIT: u64 = 0x8000_0000;
/// Upper bound on a single BIN payload.
pub const BIN_LIMIT: u32 = 0x4000_0000;
/// Upper bound on a single string (bytes, excluding the terminator).
pub const STRING_LIMIT: u32 = 0x0100_0000;
/// Type-tag bit marking a header field.
pub const FLAG_HEADER_FIELD: u16 = 0x8000;

pub(crate) const ENCODING_BYTES: u64 = 2;
pub(crate) const TYPE_BYTES: u64 = 2;
pub(crate) const LENGTH_BYTES: u64 = 4;
pub(crate) const FIELD_COUNT_BYTES: u64 = 4;

/// Binary codec failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    // Encode side
    /// Encoded size would exceed [`ENCODED_LIMIT`].
    TooLarge { size: u64 },
    /// A string exceeds [`STRING_LIMIT`].
    StringTooLong { field: String, len: u64 },
    /// A BIN payload exceeds [`BIN_LIMIT`].
    BinaryTooLong { field: String, len: u64 },
    /// A string contains an interior NUL and cannot be framed.
    EmbeddedNul { field: String },
    /// Destination buffer shorter than the computed length.
    BufferTooSmall { needed: usize, available: usize },

    // Decode side
    /// Input buffer is at or above [`ENCODED_LIMIT`].
    InputTooLarge { len: u64 },
    /// A read would pass the end of the buffer.
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    UnsupportedVersion(u16),
    /// String count of zero or above the limit.
    InvalidStringLength { offset: usize, count: u32 },
    /// Last byte of a string is not NUL.
    MissingTerminator { offset: usize },
    InvalidUtf8 { offset: usize },
    UnknownFieldType { offset: usize, tag: u16 },
    InvalidFieldName { offset: usize },
    EmptySubject { offset: usize },
    InvalidMessageKind { offset: usize, value: u16 },
    NegativeFieldCount(i32),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TooLarge { size } => {
                write!(f, "Encoded content too large ({} bytes)", size)
            }
            CodecError::StringTooLong { field, len } => {
                write!(f, "Excessive string length in field '{}' ({} bytes)", field, len)
            }
            CodecError::BinaryTooLong { field, len } => {
                write!(f, "Excessive binary data in field '{}' ({} bytes)", field, len)
            }
            CodecError::EmbeddedNul { field } => {
                write!(f, "string in field '{}' contains a NUL byte", field)
            }
            CodecError::BufferTooSmall { needed, available } => write!(
                f,
                "write failed: buffer holds {} bytes, {} needed",
                available, needed
            ),
            CodecError::InputTooLarge { len } => {
                write!(f, "Encoded content too large ({} bytes)", len)
            }
            CodecError::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "read failed at offset {}: {} bytes needed, {} available",
                offset, needed, available
            ),
            CodecError::UnsupportedVersion(v) => write!(f, "unsupported encoding version {}", v),
            CodecError::InvalidStringLength { offset, count } => {
                write!(f, "invalid string length {} at offset {}", count, offset)
            }
            CodecError::MissingTerminator { offset } => {
                write!(f, "string at offset {} is not NUL-terminated", offset)
            }
            CodecError::InvalidUtf8 { offset } => {
                write!(f, "string at offset {} is not valid UTF-8", offset)
            }
            CodecError::UnknownFieldType { offset, tag } => {
                write!(f, "unknown field type {} at offset {}", tag, offset)
            }
            CodecError::InvalidFieldName { offset } => {
                write!(f, "empty field name at offset {}", offset)
            }
            CodecError::EmptySubject { offset } => write!(f, "empty subject at offset {}", offset),
            CodecError::InvalidMessageKind { offset, value } => {
                write!(f, "invalid message kind {} at offset {}", value, offset)
            }
            CodecError::NegativeFieldCount(n) => write!(f, "negative field count {}", n),
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = core::result::Result<T, CodecError>;
