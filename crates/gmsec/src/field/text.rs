// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Textual field forms: value text, BITS hex, XML and JSON.

use super::{Field, FieldType, FieldValue};
use crate::error::{Error, Result};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Uppercase hex dump.
pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0F) as usize] as char);
    }
    out
}

/// Decode a hex dump (either case). Odd length or non-hex digits yield `None`.
pub(crate) fn hex_decode(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return None;
    }
    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some(((hi << 4) | lo) as u8)
        })
        .collect()
}

/// Escape the five XML special characters.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Hex of the big-endian IEEE-754 bit pattern of an F32/F64 value
/// (8 or 16 uppercase digits). Other kinds have no BITS form.
pub fn format_bits(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::F32(v) => Some(hex_encode(&v.to_be_bytes())),
        FieldValue::F64(v) => Some(hex_encode(&v.to_be_bytes())),
        _ => None,
    }
}

/// Inverse of [`format_bits`].
pub fn parse_bits(ty: FieldType, hex: &str) -> Option<FieldValue> {
    let bytes = hex_decode(hex)?;
    match ty {
        FieldType::F32 => {
            let arr: [u8; 4] = bytes.as_slice().try_into().ok()?;
            Some(FieldValue::F32(f32::from_be_bytes(arr)))
        }
        FieldType::F64 => {
            let arr: [u8; 8] = bytes.as_slice().try_into().ok()?;
            Some(FieldValue::F64(f64::from_be_bytes(arr)))
        }
        _ => None,
    }
}

fn float_text<T: Into<f64> + std::fmt::Display + Copy>(v: T) -> String {
    let wide: f64 = v.into();
    if wide.is_nan() {
        "NaN".to_string()
    } else if wide == f64::INFINITY {
        "Infinity".to_string()
    } else if wide == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{}", v)
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text.trim() {
        "NaN" | "nan" => Some(f64::NAN),
        "Infinity" | "inf" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" | "-inf" => Some(f64::NEG_INFINITY),
        t => t.parse().ok(),
    }
}

pub(super) fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Char(v) => (*v as char).to_string(),
        FieldValue::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        FieldValue::I8(v) => v.to_string(),
        FieldValue::U8(v) => v.to_string(),
        FieldValue::I16(v) => v.to_string(),
        FieldValue::U16(v) => v.to_string(),
        FieldValue::I32(v) => v.to_string(),
        FieldValue::U32(v) => v.to_string(),
        FieldValue::I64(v) => v.to_string(),
        FieldValue::U64(v) => v.to_string(),
        FieldValue::F32(v) => float_text(*v),
        FieldValue::F64(v) => float_text(*v),
        FieldValue::String(s) => s.clone(),
        FieldValue::Binary(b) => hex_encode(b),
    }
}

/// Value text as written inside `<FIELD>`: CHAR 0 is `nul` and U16 goes
/// through its 16-bit signed shadow.
fn xml_value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Char(0) => "nul".to_string(),
        FieldValue::U16(v) => (*v as i16).to_string(),
        FieldValue::String(s) => xml_escape(s),
        other => value_text(other),
    }
}

pub(super) fn parse_value(
    name: &str,
    ty: FieldType,
    text: &str,
    bits: Option<&str>,
) -> Result<FieldValue> {
    let bad = || {
        Error::Parse(format!(
            "field '{}': cannot parse '{}' as {}",
            name,
            text,
            ty.name()
        ))
    };

    if let Some(hex) = bits {
        if ty.supports_bits() {
            return parse_bits(ty, hex).ok_or_else(|| {
                Error::Parse(format!("field '{}': invalid BITS value '{}'", name, hex))
            });
        }
    }

    let t = text.trim();
    let value = match ty {
        FieldType::Unset => {
            return Err(Error::Parse(format!("field '{}' has no valid type", name)));
        }
        FieldType::Char => match text {
            "nul" | "" => FieldValue::Char(0),
            _ => FieldValue::Char(text.as_bytes()[0]),
        },
        FieldType::Bool => FieldValue::Bool(crate::config::parse_bool(t).ok_or_else(bad)?),
        FieldType::I8 => FieldValue::I8(t.parse().map_err(|_| bad())?),
        FieldType::U8 => FieldValue::U8(t.parse().map_err(|_| bad())?),
        FieldType::I16 => FieldValue::I16(t.parse().map_err(|_| bad())?),
        FieldType::U16 => {
            // Accept the signed shadow rendering produced by to_xml.
            let wide: i32 = t.parse().map_err(|_| bad())?;
            match wide {
                0..=65535 => FieldValue::U16(wide as u16),
                -32768..=-1 => FieldValue::U16(wide as i16 as u16),
                _ => return Err(bad()),
            }
        }
        FieldType::I32 => FieldValue::I32(t.parse().map_err(|_| bad())?),
        FieldType::U32 => FieldValue::U32(t.parse().map_err(|_| bad())?),
        FieldType::I64 => FieldValue::I64(t.parse().map_err(|_| bad())?),
        FieldType::U64 => FieldValue::U64(t.parse().map_err(|_| bad())?),
        FieldType::F32 => FieldValue::F32(parse_float(t).ok_or_else(bad)? as f32),
        FieldType::F64 => FieldValue::F64(parse_float(t).ok_or_else(bad)?),
        FieldType::String => FieldValue::String(text.to_string()),
        FieldType::Binary => FieldValue::Binary(hex_decode(t).ok_or_else(bad)?),
    };
    Ok(value)
}

pub(super) fn field_to_xml(field: &Field) -> String {
    let mut out = format!(
        "<FIELD TYPE=\"{}\" NAME=\"{}\"",
        field.field_type().name(),
        xml_escape(field.name())
    );
    if field.is_header() {
        out.push_str(" HEAD=\"T\"");
    }
    if let Some(bits) = field.value().and_then(format_bits) {
        out.push_str(" BITS=\"");
        out.push_str(&bits);
        out.push('"');
    }
    out.push('>');
    if let Some(v) = field.value() {
        out.push_str(&xml_value_text(v));
    }
    out.push_str("</FIELD>");
    out
}

#[cfg(feature = "text-formats")]
impl Field {
    /// Parse a `<FIELD>` element.
    pub(crate) fn from_xml_node(node: roxmltree::Node<'_, '_>) -> Result<Field> {
        let name = node
            .attribute("NAME")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Parse("FIELD without NAME attribute".into()))?;
        let type_name = node
            .attribute("TYPE")
            .ok_or_else(|| Error::Parse(format!("FIELD '{}' without TYPE attribute", name)))?;
        let ty = FieldType::lookup(type_name);
        let text = node.text().unwrap_or("");
        let mut field = Field::parse_typed(name, ty, text, node.attribute("BITS"))?;
        field.set_header(node.attribute("HEAD").is_some_and(|h| h.starts_with('T')));
        Ok(field)
    }

    /// Parse a standalone `<FIELD ...>` document.
    pub fn from_xml(xml: &str) -> Result<Field> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| Error::Parse(format!("invalid field XML: {}", e)))?;
        Field::from_xml_node(doc.root_element())
    }

    /// JSON object form `{"NAME":..,"TYPE":..,"VALUE":..}`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&JsonField::from(self)).unwrap_or_default()
    }
}

/// Serde shape of one field in the JSON message form.
#[cfg(feature = "text-formats")]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct JsonField {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "TYPE")]
    pub ty: String,
    #[serde(rename = "VALUE", default)]
    pub value: String,
    #[serde(rename = "HEAD", default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(rename = "BITS", default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
}

#[cfg(feature = "text-formats")]
impl From<&Field> for JsonField {
    fn from(field: &Field) -> Self {
        JsonField {
            name: field.name().to_string(),
            ty: field.field_type().name().to_string(),
            value: field.to_text(),
            head: field.is_header().then(|| "T".to_string()),
            bits: field.value().and_then(format_bits),
        }
    }
}

#[cfg(feature = "text-formats")]
impl TryFrom<JsonField> for Field {
    type Error = Error;

    fn try_from(json: JsonField) -> Result<Field> {
        if json.name.is_empty() {
            return Err(Error::Parse("JSON field without NAME".into()));
        }
        let ty = FieldType::lookup(&json.ty);
        let mut field = Field::parse_typed(json.name, ty, &json.value, json.bits.as_deref())?;
        field.set_header(json.head.as_deref().is_some_and(|h| h.starts_with('T')));
        Ok(field)
    }
}
