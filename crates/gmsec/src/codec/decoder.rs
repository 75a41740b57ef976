// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::cursor::ReadCursor;
use super::{
    CodecError, CodecResult, BIN_LIMIT, ENCODED_LIMIT, ENCODING_VERSION, FLAG_HEADER_FIELD,
    STRING_LIMIT,
};
use crate::field::{Field, FieldType, FieldValue};
use crate::message::{Message, MessageKind};

/// Message decoder. Must be configured like the encoder that produced the
/// buffer (header section on or off).
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    header: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the kind and subject ahead of the field count.
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Decode into a new message.
    ///
    /// Without a header section the subject is left empty and the kind is
    /// PUBLISH; use [`decode_into`](Self::decode_into) to supply them.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Message> {
        let mut msg = Message::new("", MessageKind::Publish);
        self.decode_into(bytes, &mut msg)?;
        Ok(msg)
    }

    /// Decode fields (and, with a header section, subject and kind) into `msg`.
    ///
    /// On error `msg` may hold the fields decoded so far; callers decoding
    /// into a fresh message simply drop it.
    pub fn decode_into(&self, bytes: &[u8], msg: &mut Message) -> CodecResult<()> {
        let len = bytes.len() as u64;
        if len >= ENCODED_LIMIT {
            return Err(CodecError::InputTooLarge { len });
        }

        let mut r = ReadCursor::new(bytes);
        let version = r.read_u16()?;
        if version != ENCODING_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        if self.header {
            let offset = r.offset();
            let raw = r.read_u16()?;
            let kind = MessageKind::from_wire(raw)
                .ok_or(CodecError::InvalidMessageKind { offset, value: raw })?;
            let offset = r.offset();
            let subject = r.read_string(STRING_LIMIT + 1)?;
            msg.set_subject(subject)
                .map_err(|_| CodecError::EmptySubject { offset })?;
            msg.set_kind(kind);
        }

        let count = r.read_i32()?;
        if count < 0 {
            return Err(CodecError::NegativeFieldCount(count));
        }

        for _ in 0..count {
            let offset = r.offset();
            let field = decode_field(&mut r)?;
            msg.add_field(field)
                .map_err(|_| CodecError::InvalidFieldName { offset })?;
        }

        if r.remaining() > 0 {
            log::debug!(
                "[codec] {} trailing bytes after {} fields ignored",
                r.remaining(),
                count
            );
        }
        Ok(())
    }
}

fn decode_field(r: &mut ReadCursor<'_>) -> CodecResult<Field> {
    let offset = r.offset();
    let raw = r.read_u16()?;
    let header = raw & FLAG_HEADER_FIELD != 0;
    let tag = raw & !FLAG_HEADER_FIELD;
    let ty = match FieldType::from_tag(tag) {
        Some(FieldType::Unset) | None => {
            return Err(CodecError::UnknownFieldType { offset, tag });
        }
        Some(ty) => ty,
    };

    let name_offset = r.offset();
    let name = r.read_string(STRING_LIMIT + 1)?;
    if name.is_empty() {
        return Err(CodecError::InvalidFieldName {
            offset: name_offset,
        });
    }

    let value = match ty {
        FieldType::Char => FieldValue::Char(r.read_u8()?),
        FieldType::Bool => FieldValue::Bool(r.read_u8()? != 0),
        FieldType::I8 => FieldValue::I8(r.read_i8()?),
        FieldType::U8 => FieldValue::U8(r.read_u8()?),
        FieldType::I16 => FieldValue::I16(r.read_i16()?),
        FieldType::U16 => FieldValue::U16(r.read_u16()?),
        FieldType::I32 => FieldValue::I32(r.read_i32()?),
        FieldType::U32 => FieldValue::U32(r.read_u32()?),
        FieldType::I64 => FieldValue::I64(r.read_i64()?),
        FieldType::U64 => FieldValue::U64(r.read_u64()?),
        FieldType::F32 => FieldValue::F32(r.read_f32()?),
        FieldType::F64 => FieldValue::F64(r.read_f64()?),
        FieldType::String => FieldValue::String(r.read_string(STRING_LIMIT + 1)?.to_string()),
        FieldType::Binary => FieldValue::Binary(r.read_counted_bytes(BIN_LIMIT)?.to_vec()),
        FieldType::Unset => return Err(CodecError::UnknownFieldType { offset, tag }),
    };

    Ok(Field::new(name, value).with_header(header))
}
