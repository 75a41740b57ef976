// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field type tags and the typed value sum type.

use std::cmp::Ordering;

/// Wire type tag of a field.
///
/// Discriminants are the on-the-wire tag values; they are not contiguous
/// (the 8/64-bit integer kinds were added after the original ten).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum FieldType {
    Unset = 0,
    Char = 1,
    Bool = 2,
    I16 = 3,
    U16 = 4,
    I32 = 5,
    U32 = 6,
    F32 = 7,
    F64 = 8,
    String = 9,
    Binary = 10,
    I8 = 20,
    U8 = 21,
    I64 = 22,
    U64 = 23,
}

impl FieldType {
    /// Every settable type (excludes `Unset`).
    pub const ALL: [FieldType; 14] = [
        FieldType::Char,
        FieldType::Bool,
        FieldType::I8,
        FieldType::U8,
        FieldType::I16,
        FieldType::U16,
        FieldType::I32,
        FieldType::U32,
        FieldType::I64,
        FieldType::U64,
        FieldType::F32,
        FieldType::F64,
        FieldType::String,
        FieldType::Binary,
    ];

    /// Wire tag value.
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Map a wire tag back to a type. `0` (UNSET) and unknown tags yield `None`.
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(FieldType::Char),
            2 => Some(FieldType::Bool),
            3 => Some(FieldType::I16),
            4 => Some(FieldType::U16),
            5 => Some(FieldType::I32),
            6 => Some(FieldType::U32),
            7 => Some(FieldType::F32),
            8 => Some(FieldType::F64),
            9 => Some(FieldType::String),
            10 => Some(FieldType::Binary),
            20 => Some(FieldType::I8),
            21 => Some(FieldType::U8),
            22 => Some(FieldType::I64),
            23 => Some(FieldType::U64),
            _ => None,
        }
    }

    /// Canonical type name used in XML/JSON (`"I16"`, `"BIN"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Unset => "UNSET",
            FieldType::Char => "CHAR",
            FieldType::Bool => "BOOL",
            FieldType::I8 => "I8",
            FieldType::U8 => "U8",
            FieldType::I16 => "I16",
            FieldType::U16 => "U16",
            FieldType::I32 => "I32",
            FieldType::U32 => "U32",
            FieldType::I64 => "I64",
            FieldType::U64 => "U64",
            FieldType::F32 => "F32",
            FieldType::F64 => "F64",
            FieldType::String => "STRING",
            FieldType::Binary => "BIN",
        }
    }

    /// Resolve a type name or one of its legacy aliases (case-insensitive).
    ///
    /// Unknown names resolve to `Unset`.
    pub fn lookup(name: &str) -> FieldType {
        const ALIASES: &[(&str, FieldType)] = &[
            ("BIN", FieldType::Binary),
            ("BLOB", FieldType::Binary),
            ("BOOL", FieldType::Bool),
            ("BOOLEAN", FieldType::Bool),
            ("CHAR", FieldType::Char),
            ("DOUBLE", FieldType::F64),
            ("F32", FieldType::F32),
            ("F64", FieldType::F64),
            ("FLOAT", FieldType::F32),
            ("I8", FieldType::I8),
            ("I16", FieldType::I16),
            ("I32", FieldType::I32),
            ("I64", FieldType::I64),
            ("LONG", FieldType::I32),
            ("SHORT", FieldType::I16),
            ("STRING", FieldType::String),
            ("U8", FieldType::U8),
            ("U16", FieldType::U16),
            ("U32", FieldType::U32),
            ("U64", FieldType::U64),
            ("ULONG", FieldType::U32),
            ("USHORT", FieldType::U16),
        ];
        let name = name.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, ty)| *ty)
            .unwrap_or(FieldType::Unset)
    }

    /// Fixed payload width on the wire, `None` for length-prefixed kinds.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::Char | FieldType::Bool | FieldType::I8 | FieldType::U8 => Some(1),
            FieldType::I16 | FieldType::U16 => Some(2),
            FieldType::I32 | FieldType::U32 | FieldType::F32 => Some(4),
            FieldType::I64 | FieldType::U64 | FieldType::F64 => Some(8),
            FieldType::Unset | FieldType::String | FieldType::Binary => None,
        }
    }

    /// Whether a textual form may carry a `BITS` hex attribute.
    pub fn supports_bits(self) -> bool {
        matches!(self, FieldType::F32 | FieldType::F64)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Char(u8),
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Binary(Vec<u8>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Char(_) => FieldType::Char,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Binary(_) => FieldType::Binary,
        }
    }

    /// Signed integer view of any numeric, boolean or char value.
    ///
    /// Strings parse as decimal; floats truncate toward zero. Binary has no
    /// integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Char(v) => Some(*v as i64),
            FieldValue::Bool(v) => Some(*v as i64),
            FieldValue::I8(v) => Some(*v as i64),
            FieldValue::U8(v) => Some(*v as i64),
            FieldValue::I16(v) => Some(*v as i64),
            FieldValue::U16(v) => Some(*v as i64),
            FieldValue::I32(v) => Some(*v as i64),
            FieldValue::U32(v) => Some(*v as i64),
            FieldValue::I64(v) => Some(*v),
            FieldValue::U64(v) => i64::try_from(*v).ok(),
            FieldValue::F32(v) if v.is_finite() => Some(*v as i64),
            FieldValue::F64(v) if v.is_finite() => Some(*v as i64),
            FieldValue::F32(_) | FieldValue::F64(_) => None,
            FieldValue::String(s) => s.trim().parse().ok(),
            FieldValue::Binary(_) => None,
        }
    }

    /// Unsigned integer view; negative values have none.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U64(v) => Some(*v),
            FieldValue::String(s) => s.trim().parse().ok(),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::F32(v) => Some(*v as f64),
            FieldValue::F64(v) => Some(*v),
            FieldValue::U64(v) => Some(*v as f64),
            FieldValue::String(s) => s.trim().parse().ok(),
            FieldValue::Binary(_) => None,
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Boolean view: non-zero numbers are true, strings accept the usual spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            FieldValue::String(s) => crate::config::parse_bool(s),
            FieldValue::F32(v) => Some(*v != 0.0),
            FieldValue::F64(v) => Some(*v != 0.0),
            FieldValue::Binary(_) => None,
            other => other.as_i64().map(|v| v != 0),
        }
    }

    /// Compare two values of the same type. Different types are unordered.
    pub fn partial_cmp_same_type(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Char(a), FieldValue::Char(b)) => a.partial_cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.partial_cmp(b),
            (FieldValue::I8(a), FieldValue::I8(b)) => a.partial_cmp(b),
            (FieldValue::U8(a), FieldValue::U8(b)) => a.partial_cmp(b),
            (FieldValue::I16(a), FieldValue::I16(b)) => a.partial_cmp(b),
            (FieldValue::U16(a), FieldValue::U16(b)) => a.partial_cmp(b),
            (FieldValue::I32(a), FieldValue::I32(b)) => a.partial_cmp(b),
            (FieldValue::U32(a), FieldValue::U32(b)) => a.partial_cmp(b),
            (FieldValue::I64(a), FieldValue::I64(b)) => a.partial_cmp(b),
            (FieldValue::U64(a), FieldValue::U64(b)) => a.partial_cmp(b),
            (FieldValue::F32(a), FieldValue::F32(b)) => a.partial_cmp(b),
            (FieldValue::F64(a), FieldValue::F64(b)) => a.partial_cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.partial_cmp(b),
            (FieldValue::Binary(a), FieldValue::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Binary,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Binary(v.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for ty in FieldType::ALL {
            assert_eq!(FieldType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(FieldType::from_tag(0), None);
        assert_eq!(FieldType::from_tag(11), None);
        assert_eq!(FieldType::String.tag(), 9);
        assert_eq!(FieldType::U64.tag(), 23);
    }

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(FieldType::lookup("boolean"), FieldType::Bool);
        assert_eq!(FieldType::lookup("BLOB"), FieldType::Binary);
        assert_eq!(FieldType::lookup("DOUBLE"), FieldType::F64);
        assert_eq!(FieldType::lookup("float"), FieldType::F32);
        assert_eq!(FieldType::lookup("ULONG"), FieldType::U32);
        assert_eq!(FieldType::lookup("SHORT"), FieldType::I16);
        assert_eq!(FieldType::lookup("nonsense"), FieldType::Unset);
        for ty in FieldType::ALL {
            assert_eq!(FieldType::lookup(ty.name()), ty);
        }
    }

    #[test]
    fn test_cross_type_views() {
        assert_eq!(FieldValue::I16(-3).as_i64(), Some(-3));
        assert_eq!(FieldValue::I16(-3).as_u64(), None);
        assert_eq!(FieldValue::from("42").as_u64(), Some(42));
        assert_eq!(FieldValue::F64(2.9).as_i64(), Some(2));
        assert_eq!(FieldValue::U8(0).as_bool(), Some(false));
        assert_eq!(FieldValue::from("yes").as_bool(), Some(true));
        assert_eq!(FieldValue::Binary(vec![1]).as_f64(), None);
        assert_eq!(FieldValue::U64(u64::MAX).as_i64(), None);
    }

    #[test]
    fn test_ordering_requires_same_type() {
        let a = FieldValue::I32(1);
        let b = FieldValue::I32(2);
        assert_eq!(a.partial_cmp_same_type(&b), Some(Ordering::Less));
        assert_eq!(a.partial_cmp_same_type(&FieldValue::I64(2)), None);
    }
}
