// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::cursor::WriteCursor;
use super::{
    CodecError, CodecResult, BIN_LIMIT, ENCODED_LIMIT, ENCODING_BYTES, ENCODING_VERSION,
    FIELD_COUNT_BYTES, FLAG_HEADER_FIELD, LENGTH_BYTES, STRING_LIMIT, TYPE_BYTES,
};
use crate::field::{Field, FieldValue};
use crate::message::Message;

/// Which fields of a message take part in an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldSelector {
    #[default]
    All,
    HeaderOnly,
    NonHeader,
}

impl FieldSelector {
    fn accepts(self, field: &Field) -> bool {
        match self {
            FieldSelector::All => true,
            FieldSelector::HeaderOnly => field.is_header(),
            FieldSelector::NonHeader => !field.is_header(),
        }
    }
}

/// Two-pass message encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    header: bool,
    selector: FieldSelector,
}

impl Encoder {
    /// All fields, no header section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also encode the message kind and subject ahead of the field count.
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    #[must_use]
    pub fn with_selector(mut self, selector: FieldSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Exact encoded size of `msg`, enforcing every size ceiling.
    pub fn find_length(&self, msg: &Message) -> CodecResult<u64> {
        let mut length = ENCODING_BYTES;
        if self.header {
            length += TYPE_BYTES + string_length("SUBJECT", msg.subject())?;
        }
        length += FIELD_COUNT_BYTES;

        for field in msg.fields().filter(|f| self.selector.accepts(f)) {
            length += TYPE_BYTES + string_length(field.name(), field.name())?;
            length += payload_length(field)?;
            if length > ENCODED_LIMIT {
                return Err(CodecError::TooLarge { size: length });
            }
        }

        if length > ENCODED_LIMIT {
            return Err(CodecError::TooLarge { size: length });
        }
        Ok(length)
    }

    /// Encode into a freshly allocated buffer of exactly `find_length` bytes.
    pub fn encode(&self, msg: &Message) -> CodecResult<Vec<u8>> {
        let length = self.find_length(msg)? as usize;
        let mut buf = vec![0u8; length];
        let written = self.write(msg, &mut buf)?;
        debug_assert_eq!(written, length);
        log::trace!("[codec] encoded '{}' into {} bytes", msg.subject(), written);
        Ok(buf)
    }

    /// Encode into a caller buffer; returns the number of bytes written.
    ///
    /// Nothing is written unless the whole message fits.
    pub fn encode_into(&self, msg: &Message, buf: &mut [u8]) -> CodecResult<usize> {
        let length = self.find_length(msg)? as usize;
        if length > buf.len() {
            return Err(CodecError::BufferTooSmall {
                needed: length,
                available: buf.len(),
            });
        }
        self.write(msg, &mut buf[..length])
    }

    fn write(&self, msg: &Message, buf: &mut [u8]) -> CodecResult<usize> {
        let mut w = WriteCursor::new(buf);
        w.write_u16(ENCODING_VERSION)?;
        if self.header {
            w.write_u16(msg.kind() as u16)?;
            w.write_string(msg.subject())?;
        }

        let count = msg.fields().filter(|f| self.selector.accepts(f)).count();
        w.write_i32(count as i32)?;

        for field in msg.fields().filter(|f| self.selector.accepts(f)) {
            let value = field.value().ok_or_else(|| unset(field))?;
            let mut tag = field.field_type().tag();
            if field.is_header() {
                tag |= FLAG_HEADER_FIELD;
            }
            w.write_u16(tag)?;
            w.write_string(field.name())?;
            write_payload(&mut w, value)?;
        }
        Ok(w.offset())
    }
}

fn unset(field: &Field) -> CodecError {
    // Messages refuse UNSET fields, so this only fires for hand-built input.
    CodecError::UnknownFieldType {
        offset: 0,
        tag: field.field_type().tag(),
    }
}

/// Framed size of a string: count prefix, bytes and terminator.
fn string_length(field: &str, s: &str) -> CodecResult<u64> {
    let len = s.len() as u64;
    if len > u64::from(STRING_LIMIT) {
        return Err(CodecError::StringTooLong {
            field: field.to_string(),
            len,
        });
    }
    if s.as_bytes().contains(&0) {
        return Err(CodecError::EmbeddedNul {
            field: field.to_string(),
        });
    }
    Ok(LENGTH_BYTES + len + 1)
}

fn payload_length(field: &Field) -> CodecResult<u64> {
    let value = field.value().ok_or_else(|| unset(field))?;
    Ok(match value {
        FieldValue::Char(_) | FieldValue::Bool(_) | FieldValue::I8(_) | FieldValue::U8(_) => 1,
        FieldValue::I16(_) | FieldValue::U16(_) => 2,
        FieldValue::I32(_) | FieldValue::U32(_) | FieldValue::F32(_) => 4,
        FieldValue::I64(_) | FieldValue::U64(_) | FieldValue::F64(_) => 8,
        FieldValue::String(s) => string_length(field.name(), s)?,
        FieldValue::Binary(b) => {
            let len = b.len() as u64;
            if len > u64::from(BIN_LIMIT) {
                return Err(CodecError::BinaryTooLong {
                    field: field.name().to_string(),
                    len,
                });
            }
            LENGTH_BYTES + len
        }
    })
}

fn write_payload(w: &mut WriteCursor<'_>, value: &FieldValue) -> CodecResult<()> {
    match value {
        FieldValue::Char(v) => w.write_u8(*v),
        FieldValue::Bool(v) => w.write_u8(u8::from(*v)),
        FieldValue::I8(v) => w.write_i8(*v),
        FieldValue::U8(v) => w.write_u8(*v),
        FieldValue::I16(v) => w.write_i16(*v),
        FieldValue::U16(v) => w.write_u16(*v),
        FieldValue::I32(v) => w.write_i32(*v),
        FieldValue::U32(v) => w.write_u32(*v),
        FieldValue::I64(v) => w.write_i64(*v),
        FieldValue::U64(v) => w.write_u64(*v),
        FieldValue::F32(v) => w.write_f32(*v),
        FieldValue::F64(v) => w.write_f64(*v),
        FieldValue::String(s) => w.write_string(s),
        FieldValue::Binary(b) => w.write_counted_bytes(b),
    }
}
