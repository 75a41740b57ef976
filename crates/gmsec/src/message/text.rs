// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML and JSON forms of a message.

use super::Message;
use crate::field::xml_escape;

#[cfg(feature = "text-formats")]
use super::MessageKind;
#[cfg(feature = "text-formats")]
use crate::error::{Error, Result};
#[cfg(feature = "text-formats")]
use crate::field::{Field, JsonField};

impl Message {
    /// Render as `<MESSAGE SUBJECT=".." KIND="..">` with one `<FIELD>` per line.
    ///
    /// The local config is included as a `<CONFIG>` block when non-empty.
    pub fn to_xml(&self) -> String {
        let mut out = format!(
            "<MESSAGE SUBJECT=\"{}\" KIND=\"{}\"",
            xml_escape(self.subject()),
            self.kind().name()
        );
        let has_config = !self.config().is_empty();
        let has_fields = self.field_count() > 0;
        if !has_config && !has_fields {
            out.push_str("/>");
            return out;
        }
        out.push_str(">\n");
        if has_config {
            out.push_str(&self.config().to_xml());
            out.push('\n');
        }
        for field in self.fields() {
            out.push('\t');
            out.push_str(&field.to_xml());
            out.push('\n');
        }
        out.push_str("</MESSAGE>");
        out
    }

    /// Parse the form produced by [`to_xml`](Self::to_xml).
    ///
    /// `KIND` (or the older `TYPE`) selects the kind; when both are missing
    /// the kind is deduced from MESSAGE-TYPE.
    #[cfg(feature = "text-formats")]
    pub fn from_xml(xml: &str) -> Result<Message> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| Error::Parse(format!("invalid message XML: {}", e)))?;
        let root = doc.root_element();
        if !root.has_tag_name("MESSAGE") {
            return Err(Error::Parse(format!(
                "expected <MESSAGE> element, found <{}>",
                root.tag_name().name()
            )));
        }

        let subject = root.attribute("SUBJECT").unwrap_or("");
        if subject.is_empty() {
            return Err(Error::EmptySubject);
        }
        let kind = root.attribute("KIND").or_else(|| root.attribute("TYPE"));
        let mut msg = new_with_kind_text(subject, kind)?;

        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "CONFIG" => msg.set_config(crate::config::Config::from_xml_node(child)?),
                "FIELD" => {
                    msg.add_field(Field::from_xml_node(child)?)?;
                }
                other => log::debug!("[message] Ignoring unknown XML element <{}>", other),
            }
        }
        Ok(msg)
    }

    /// `{"MESSAGE":{"SUBJECT":..,"KIND":..,"FIELD":[..]}}`.
    #[cfg(feature = "text-formats")]
    pub fn to_json(&self) -> String {
        let envelope = JsonEnvelope {
            message: JsonMessage {
                subject: self.subject().to_string(),
                kind: Some(self.kind().name().to_string()),
                fields: self.fields().map(JsonField::from).collect(),
            },
        };
        serde_json::to_string(&envelope).unwrap_or_default()
    }

    /// Parse the form produced by [`to_json`](Self::to_json).
    #[cfg(feature = "text-formats")]
    pub fn from_json(json: &str) -> Result<Message> {
        let envelope: JsonEnvelope = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("invalid message JSON: {}", e)))?;
        let JsonMessage {
            subject,
            kind,
            fields,
        } = envelope.message;
        if subject.is_empty() {
            return Err(Error::EmptySubject);
        }
        let mut msg = new_with_kind_text(&subject, kind.as_deref())?;
        for field in fields {
            msg.add_field(Field::try_from(field)?)?;
        }
        Ok(msg)
    }
}

#[cfg(feature = "text-formats")]
fn new_with_kind_text(subject: &str, kind: Option<&str>) -> Result<Message> {
    match kind {
        Some(text) => MessageKind::from_name(text)
            .map(|k| Message::new(subject, k))
            .ok_or_else(|| Error::Parse(format!("unknown message kind '{}'", text))),
        None => Ok(Message::deduced(subject)),
    }
}

#[cfg(feature = "text-formats")]
#[derive(serde::Serialize, serde::Deserialize)]
struct JsonEnvelope {
    #[serde(rename = "MESSAGE")]
    message: JsonMessage,
}

#[cfg(feature = "text-formats")]
#[derive(serde::Serialize, serde::Deserialize)]
struct JsonMessage {
    #[serde(rename = "SUBJECT")]
    subject: String,
    #[serde(rename = "KIND", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(rename = "FIELD", default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<JsonField>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn test_empty_message_xml_is_self_closing() {
        let msg = Message::new("GMSEC.A", MessageKind::Request);
        assert_eq!(
            msg.to_xml(),
            "<MESSAGE SUBJECT=\"GMSEC.A\" KIND=\"REQUEST\"/>"
        );
    }

    #[test]
    fn test_xml_layout() {
        let mut msg = Message::new("GMSEC.A", MessageKind::Publish);
        msg.add("X", 1i16).unwrap();
        assert_eq!(
            msg.to_xml(),
            "<MESSAGE SUBJECT=\"GMSEC.A\" KIND=\"PUBLISH\">\n\
             \t<FIELD TYPE=\"I16\" NAME=\"X\">1</FIELD>\n\
             </MESSAGE>"
        );
    }

    #[cfg(feature = "text-formats")]
    fn sample() -> Message {
        let mut msg = Message::new("GMSEC.MISSION.SAT.MSG.LOG", MessageKind::Publish);
        msg.add("MESSAGE-TYPE", "MSG").unwrap();
        msg.add("SEVERITY", 3i16).unwrap();
        msg.add("RATE", 0.25f64).unwrap();
        msg.add("BLOB", vec![0u8, 255]).unwrap();
        msg.add_field(Field::header("TRACK", true)).unwrap();
        msg.config_mut().set("k", "v");
        msg
    }

    #[cfg(feature = "text-formats")]
    #[test]
    fn test_xml_round_trip_keeps_config() {
        let msg = sample();
        let parsed = Message::from_xml(&msg.to_xml()).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(parsed.config().get("k"), Some("v"));
    }

    #[cfg(feature = "text-formats")]
    #[test]
    fn test_json_round_trip() {
        let msg = sample();
        let json = msg.to_json();
        assert!(json.starts_with("{\"MESSAGE\":{\"SUBJECT\":\"GMSEC.MISSION.SAT.MSG.LOG\""));
        assert_eq!(Message::from_json(&json).unwrap(), msg);
    }

    #[cfg(feature = "text-formats")]
    #[test]
    fn test_from_xml_without_kind_deduces() {
        let xml = "<MESSAGE SUBJECT=\"A.B\">\
                   <FIELD TYPE=\"STRING\" NAME=\"MESSAGE-TYPE\">REQ</FIELD>\
                   </MESSAGE>";
        let msg = Message::from_xml(xml).unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);
    }

    #[cfg(feature = "text-formats")]
    #[test]
    fn test_from_xml_rejects_bad_input() {
        assert!(Message::from_xml("<CONFIG/>").is_err());
        assert!(matches!(
            Message::from_xml("<MESSAGE KIND=\"PUBLISH\"/>"),
            Err(Error::EmptySubject)
        ));
        assert!(Message::from_xml("<MESSAGE SUBJECT=\"A\" KIND=\"BOGUS\"/>").is_err());
        assert!(Message::from_json("{\"nope\":1}").is_err());
    }
}
