// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Messages: a subject, a kind and an insertion-ordered set of named fields.
//!
//! ```text
//! Message { subject: "GMSEC.MISSION.SAT.MSG.C2CX.HB", kind: PUBLISH }
//!   [0] MESSAGE-TYPE    STRING "MSG"
//!   [1] MESSAGE-SUBTYPE STRING "C2CX"
//!   [2] C2CX-SUBTYPE    STRING "HB"
//!   [3] COUNTER         U16    7
//!   config: { ... }          (local only, never encoded)
//! ```
//!
//! Field names are unique: adding a field whose name already exists replaces
//! the old value in place (position is kept) and reports `true`.

mod text;

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use std::collections::HashMap;

/// Name of the field carrying the message type (MSG/REQ/RESP).
pub const MESSAGE_TYPE: &str = "MESSAGE-TYPE";
/// Name of the field carrying the message subtype.
pub const MESSAGE_SUBTYPE: &str = "MESSAGE-SUBTYPE";
/// Name of the C2CX subtype field.
pub const C2CX_SUBTYPE: &str = "C2CX-SUBTYPE";

/// Publish/request/reply discriminator. Values are the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageKind {
    Publish = 1,
    Request = 2,
    Reply = 3,
}

impl MessageKind {
    pub fn from_wire(v: u16) -> Option<Self> {
        match v {
            1 => Some(MessageKind::Publish),
            2 => Some(MessageKind::Request),
            3 => Some(MessageKind::Reply),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Publish => "PUBLISH",
            MessageKind::Request => "REQUEST",
            MessageKind::Reply => "REPLY",
        }
    }

    /// Parse `PUBLISH`/`REQUEST`/`REPLY` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        [MessageKind::Publish, MessageKind::Request, MessageKind::Reply]
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Kind implied by a MESSAGE-TYPE value (`MSG`, `REQ`, `RESP`).
    pub fn from_message_type(value: &str) -> Option<Self> {
        match value {
            "MSG" => Some(MessageKind::Publish),
            "REQ" => Some(MessageKind::Request),
            "RESP" => Some(MessageKind::Reply),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A self-describing message.
#[derive(Debug, Clone)]
pub struct Message {
    subject: String,
    kind: MessageKind,
    deduce_kind: bool,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    config: Config,
}

impl Message {
    /// Create an empty message of an explicit kind.
    pub fn new(subject: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            subject: subject.into(),
            kind,
            deduce_kind: false,
            fields: Vec::new(),
            index: HashMap::new(),
            config: Config::new(),
        }
    }

    /// Create a message whose kind follows its MESSAGE-TYPE field.
    ///
    /// Starts as PUBLISH until a MESSAGE-TYPE of `REQ` or `RESP` is added.
    pub fn deduced(subject: impl Into<String>) -> Self {
        let mut msg = Self::new(subject, MessageKind::Publish);
        msg.deduce_kind = true;
        msg
    }

    /// Create with a message-scoped configuration.
    pub fn with_config(subject: impl Into<String>, kind: MessageKind, config: Config) -> Self {
        let mut msg = Self::new(subject, kind);
        msg.config = config;
        msg
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Set the subject; empty subjects are rejected.
    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<()> {
        let subject = subject.into();
        if subject.is_empty() {
            return Err(Error::EmptySubject);
        }
        self.subject = subject;
        Ok(())
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Explicitly set the kind; disables MESSAGE-TYPE deduction.
    pub fn set_kind(&mut self, kind: MessageKind) {
        self.kind = kind;
        self.deduce_kind = false;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    /// Copy `field` into the message.
    ///
    /// Returns `true` when a field of the same name was replaced. Empty names
    /// and UNSET fields are rejected.
    pub fn add_field(&mut self, field: Field) -> Result<bool> {
        if field.name().is_empty() {
            return Err(Error::InvalidFieldName);
        }
        if field.is_unset() {
            return Err(Error::FieldTypeMismatch(format!(
                "field '{}' is UNSET and cannot be added",
                field.name()
            )));
        }

        if self.deduce_kind && field.name() == MESSAGE_TYPE {
            if let Some(kind) = field.as_str().and_then(MessageKind::from_message_type) {
                self.kind = kind;
            }
        }

        match self.index.get(field.name()) {
            Some(&idx) => {
                self.fields[idx] = field;
                Ok(true)
            }
            None => {
                self.index.insert(field.name().to_string(), self.fields.len());
                self.fields.push(field);
                Ok(false)
            }
        }
    }

    /// Shorthand for `add_field(Field::new(name, value))`.
    pub fn add(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<bool> {
        self.add_field(Field::new(name, value))
    }

    /// Add several fields in order.
    pub fn add_fields<'a, I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Field>,
    {
        for field in fields {
            self.add_field(field.clone())?;
        }
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove a field. Returns `true` if it existed.
    pub fn remove_field(&mut self, name: &str) -> bool {
        match self.index.remove(name) {
            Some(idx) => {
                self.fields.remove(idx);
                for slot in self.index.values_mut() {
                    if *slot > idx {
                        *slot -= 1;
                    }
                }
                true
            }
            None => false,
        }
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
        self.index.clear();
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// STRING value of a field.
    pub fn get_string_value(&self, name: &str) -> Result<&str> {
        let field = self.require(name)?;
        field.as_str().ok_or_else(|| {
            Error::FieldTypeMismatch(format!(
                "field '{}' is {} not STRING",
                name,
                field.field_type()
            ))
        })
    }

    pub fn get_i64_value(&self, name: &str) -> Result<i64> {
        self.require(name)?.as_i64()
    }

    pub fn get_u64_value(&self, name: &str) -> Result<u64> {
        self.require(name)?.as_u64()
    }

    pub fn get_f64_value(&self, name: &str) -> Result<f64> {
        self.require(name)?.as_f64()
    }

    pub fn get_bool_value(&self, name: &str) -> Result<bool> {
        self.require(name)?.as_bool()
    }

    fn require(&self, name: &str) -> Result<&Field> {
        self.get_field(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// Schema identifier derived from the type fields, e.g. `MSG.C2CX.HB`
    /// or `REQ.DIR`. `None` without a MESSAGE-TYPE string field.
    pub fn schema_id(&self) -> Option<String> {
        let msg_type = self.get_field(MESSAGE_TYPE)?.as_str()?;
        let mut id = msg_type.to_string();
        if let Some(subtype) = self.get_field(MESSAGE_SUBTYPE).and_then(Field::as_str) {
            id.push('.');
            id.push_str(subtype);
            if subtype == "C2CX" {
                if let Some(c2cx) = self.get_field(C2CX_SUBTYPE).and_then(Field::as_str) {
                    id.push('.');
                    id.push_str(c2cx);
                }
            }
        }
        Some(id)
    }

    // ------------------------------------------------------------------------
    // Binary form
    // ------------------------------------------------------------------------

    /// Encode with the default encoder (all fields, no header section).
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(codec::Encoder::new().encode(self)?)
    }

    /// Decode a buffer produced by [`encode`](Self::encode).
    ///
    /// The binary form carries no subject unless header encoding was used;
    /// the decoded message gets `subject` and PUBLISH kind in that case.
    pub fn decode(subject: &str, bytes: &[u8]) -> Result<Message> {
        let mut msg = Message::new(subject, MessageKind::Publish);
        codec::Decoder::new().decode_into(bytes, &mut msg)?;
        Ok(msg)
    }
}

impl PartialEq for Message {
    /// Subject, kind and fields (in order) must match; the local config is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject && self.kind == other.kind && self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    #[test]
    fn test_add_field_replaces_same_name_in_place() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        assert!(!msg.add("X", 1i32).unwrap());
        assert!(!msg.add("Y", 2i32).unwrap());
        assert!(msg.add("X", "three").unwrap());
        assert_eq!(msg.field_count(), 2);
        let names: Vec<_> = msg.fields().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["X", "Y"]);
        assert_eq!(msg.get_field("X").unwrap().field_type(), FieldType::String);
    }

    #[test]
    fn test_add_field_copies_caller_field() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        let mut field = Field::new("REUSED", 1u8);
        msg.add_field(field.clone()).unwrap();
        field.set_value(2u8);
        assert_eq!(msg.get_u64_value("REUSED").unwrap(), 1);
    }

    #[test]
    fn test_rejects_empty_name_and_unset() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        assert!(matches!(
            msg.add_field(Field::new("", 1i8)),
            Err(Error::InvalidFieldName)
        ));
        assert!(msg.add_field(Field::unset("U")).is_err());
        assert_eq!(msg.field_count(), 0);
    }

    #[test]
    fn test_remove_field_reindexes() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            msg.add(name, i as i32).unwrap();
        }
        assert!(msg.remove_field("A"));
        assert!(!msg.remove_field("A"));
        assert_eq!(msg.get_i64_value("C").unwrap(), 2);
        msg.add("C", 9i32).unwrap();
        assert_eq!(msg.field_count(), 2);
        assert_eq!(msg.get_i64_value("C").unwrap(), 9);
    }

    #[test]
    fn test_kind_deduction_from_message_type() {
        let mut msg = Message::deduced("A.B");
        assert_eq!(msg.kind(), MessageKind::Publish);
        msg.add(MESSAGE_TYPE, "REQ").unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);

        let mut fixed = Message::new("A.B", MessageKind::Publish);
        fixed.add(MESSAGE_TYPE, "RESP").unwrap();
        assert_eq!(fixed.kind(), MessageKind::Publish);
    }

    #[test]
    fn test_schema_id() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        assert_eq!(msg.schema_id(), None);
        msg.add(MESSAGE_TYPE, "MSG").unwrap();
        msg.add(MESSAGE_SUBTYPE, "C2CX").unwrap();
        msg.add(C2CX_SUBTYPE, "HB").unwrap();
        assert_eq!(msg.schema_id().as_deref(), Some("MSG.C2CX.HB"));
    }

    #[test]
    fn test_set_subject_rejects_empty() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        assert!(matches!(msg.set_subject(""), Err(Error::EmptySubject)));
        assert_eq!(msg.subject(), "A.B");
    }

    #[test]
    fn test_typed_getters_report_missing_and_mismatch() {
        let mut msg = Message::new("A.B", MessageKind::Publish);
        msg.add("S", "text").unwrap();
        msg.add("N", 5u32).unwrap();
        assert!(matches!(
            msg.get_i64_value("missing"),
            Err(Error::FieldNotFound(_))
        ));
        assert!(matches!(
            msg.get_string_value("N"),
            Err(Error::FieldTypeMismatch(_))
        ));
        assert_eq!(msg.get_string_value("S").unwrap(), "text");
    }
}
