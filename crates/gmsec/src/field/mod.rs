// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed, named message fields.
//!
//! A [`Field`] couples a non-empty, case-sensitive name with an optional
//! [`FieldValue`] (absent value = type `UNSET`) and a header flag marking
//! tracking/meta fields. Messages store fields by value: adding a field to a
//! message copies it, the caller keeps (and may reuse) the original.
//!
//! ## Cross-type reads
//!
//! Older APIs kept "shadow" copies of a value in every compatible slot (an
//! I16 also readable as bool or u16). Here the canonical value is the only
//! storage and the compatible views are computed on demand:
//!
//! ```text
//! Field::new("N", 7i16)
//!   as_i64()  -> 7
//!   as_bool() -> true
//!   as_f64()  -> 7.0
//!   to_text() -> "7"
//! ```

mod text;
mod value;

pub use text::{format_bits, parse_bits};
pub(crate) use text::{hex_decode, hex_encode, xml_escape};
pub use value::{FieldType, FieldValue};

use crate::error::{Error, Result};
use std::cmp::Ordering;

/// A named, typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: Option<FieldValue>,
    header: bool,
}

impl Field {
    /// Create a field. An empty name is accepted here and rejected when the
    /// field is added to a message.
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            header: false,
        }
    }

    /// Create a field of type `UNSET` (no readable value).
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            header: false,
        }
    }

    /// Create a CHAR field.
    pub fn char(name: impl Into<String>, value: u8) -> Self {
        Self::new(name, FieldValue::Char(value))
    }

    /// Create a header field.
    pub fn header(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, value).with_header(true)
    }

    /// Build a field from its textual form.
    ///
    /// When `bits` is supplied for an F32/F64 field it takes precedence over
    /// `text` and is decoded as the big-endian IEEE-754 bit pattern.
    pub fn parse_typed(
        name: impl Into<String>,
        ty: FieldType,
        text: &str,
        bits: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let value = text::parse_value(&name, ty, text, bits)?;
        Ok(Self {
            name,
            value: Some(value),
            header: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the field. Empty names are rejected and leave the field unchanged.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidFieldName);
        }
        self.name = name;
        Ok(())
    }

    /// Copy of this field under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: self.value.clone(),
            header: self.header,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.value
            .as_ref()
            .map(FieldValue::field_type)
            .unwrap_or(FieldType::Unset)
    }

    pub fn is_unset(&self) -> bool {
        self.value.is_none()
    }

    /// The active value, `None` when the type is `UNSET`.
    pub fn value(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    /// Replace the value; the field's type becomes that of `value`.
    pub fn set_value(&mut self, value: impl Into<FieldValue>) {
        self.value = Some(value.into());
    }

    /// Clear the value (type becomes `UNSET`).
    pub fn clear(&mut self) {
        self.value = None;
    }

    pub fn is_header(&self) -> bool {
        self.header
    }

    pub fn set_header(&mut self, header: bool) {
        self.header = header;
    }

    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    // ------------------------------------------------------------------------
    // Cross-type reads
    // ------------------------------------------------------------------------

    pub fn as_i64(&self) -> Result<i64> {
        self.view("I64", FieldValue::as_i64)
    }

    pub fn as_u64(&self) -> Result<u64> {
        self.view("U64", FieldValue::as_u64)
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.view("F64", FieldValue::as_f64)
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.view("BOOL", FieldValue::as_bool)
    }

    /// String content of a STRING field.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Textual rendering of the value (empty for `UNSET`).
    pub fn to_text(&self) -> String {
        self.value.as_ref().map(text::value_text).unwrap_or_default()
    }

    /// Compare by (type, value). `UNSET` on either side compares equal to
    /// anything; different concrete types are unordered.
    pub fn value_cmp(&self, other: &Field) -> Option<Ordering> {
        match (&self.value, &other.value) {
            (None, _) | (_, None) => Some(Ordering::Equal),
            (Some(a), Some(b)) => a.partial_cmp_same_type(b),
        }
    }

    /// `value_cmp` equality.
    pub fn value_matches(&self, other: &Field) -> bool {
        self.value_cmp(other) == Some(Ordering::Equal)
    }

    /// Render as `<FIELD TYPE=".." NAME=".." [HEAD="T"] [BITS=".."]>value</FIELD>`.
    pub fn to_xml(&self) -> String {
        text::field_to_xml(self)
    }

    fn view<T>(&self, wanted: &str, f: impl Fn(&FieldValue) -> Option<T>) -> Result<T> {
        match &self.value {
            Some(v) => f(v).ok_or_else(|| {
                Error::FieldTypeMismatch(format!(
                    "field '{}' of type {} cannot be read as {}",
                    self.name,
                    v.field_type(),
                    wanted
                ))
            }),
            None => Err(Error::FieldTypeMismatch(format!(
                "field '{}' is UNSET",
                self.name
            ))),
        }
    }
}

#[cfg(feature = "text-formats")]
pub(crate) use text::JsonField;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_type_from_value() {
        let f = Field::new("COUNT", 5u16);
        assert_eq!(f.field_type(), FieldType::U16);
        assert_eq!(f.value(), Some(&FieldValue::U16(5)));
        assert!(!f.is_header());
    }

    #[test]
    fn test_unset_has_no_readable_value() {
        let f = Field::unset("X");
        assert_eq!(f.field_type(), FieldType::Unset);
        assert!(f.value().is_none());
        assert!(f.as_i64().is_err());
    }

    #[test]
    fn test_set_name_rejects_empty() {
        let mut f = Field::new("A", true);
        assert!(matches!(f.set_name(""), Err(Error::InvalidFieldName)));
        assert_eq!(f.name(), "A");
    }

    #[test]
    fn test_last_set_value_is_canonical() {
        let mut f = Field::new("V", 3i16);
        f.set_value("hello");
        assert_eq!(f.field_type(), FieldType::String);
        assert_eq!(f.as_str(), Some("hello"));
        assert!(f.as_i64().is_err());
    }

    #[test]
    fn test_value_cmp_unset_is_wildcard() {
        let a = Field::unset("A");
        let b = Field::new("B", 10i32);
        assert!(a.value_matches(&b));
        assert!(b.value_matches(&a));
        assert_eq!(
            Field::new("x", 1i32).value_cmp(&Field::new("y", 2i32)),
            Some(Ordering::Less)
        );
        assert_eq!(Field::new("x", 1i32).value_cmp(&Field::new("x", 1u32)), None);
    }

    #[test]
    fn test_parse_typed_with_bits() {
        let f = Field::parse_typed("PI", FieldType::F32, "3.14", Some("40490FDB")).unwrap();
        assert_eq!(f.value(), Some(&FieldValue::F32(std::f32::consts::PI)));
    }
}
