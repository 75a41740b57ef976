// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard-field tiers and version-dependent message templates.
//!
//! Every generated message is composed in one fixed order:
//!
//! ```text
//! 1. caller fields          (always kept)
//! 2. tier fields            (heartbeat or log defaults, only if absent)
//! 3. global standard fields (only if absent)
//! 4. required fields        (MESSAGE-TYPE, versions, COUNTER, ...; overwrite)
//! ```
//!
//! EVENT-TIME on log messages is the one required field that keeps a caller
//! supplied value.

use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::message::{Message, MessageKind, C2CX_SUBTYPE, MESSAGE_SUBTYPE, MESSAGE_TYPE};
use crate::specification::{GMSEC_ISD_2014_00, GMSEC_ISD_2016_00, GMSEC_ISD_2018_00};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const HEADER_VERSION: &str = "HEADER-VERSION";
pub(crate) const CONTENT_VERSION: &str = "CONTENT-VERSION";
pub(crate) const MSG_ID: &str = "MSG-ID";
pub(crate) const COUNTER: &str = "COUNTER";
pub(crate) const PUB_RATE: &str = "PUB-RATE";
pub(crate) const EVENT_TIME: &str = "EVENT-TIME";
pub(crate) const RESPONSE: &str = "RESPONSE";
pub(crate) const RESPONSE_STATUS: &str = "RESPONSE-STATUS";
pub(crate) const SEVERITY: &str = "SEVERITY";
pub(crate) const MSG_TEXT: &str = "MSG-TEXT";
pub(crate) const OPER_SYS: &str = "OPER-SYS";

/// Status carried by simple-service and directive acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    AcknowledgmentSuccessful = 1,
    WorkingKeepAlive = 2,
    SuccessfulCompletion = 3,
    FailedCompletion = 4,
    InvalidRequest = 5,
    FinalMessage = 6,
}

impl ResponseStatus {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            1 => Some(ResponseStatus::AcknowledgmentSuccessful),
            2 => Some(ResponseStatus::WorkingKeepAlive),
            3 => Some(ResponseStatus::SuccessfulCompletion),
            4 => Some(ResponseStatus::FailedCompletion),
            5 => Some(ResponseStatus::InvalidRequest),
            6 => Some(ResponseStatus::FinalMessage),
            _ => None,
        }
    }
}

/// Named parameter of a simple-service request.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceParam {
    name: String,
    value: Field,
}

impl ServiceParam {
    pub fn new(name: impl Into<String>, value: Field) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Field {
        &self.value
    }
}

/// Subject plus default fields of one message family.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tier {
    pub subject: String,
    pub fields: Vec<Field>,
}

/// Copy a field list, dropping (with a warning) entries that cannot be added.
pub(crate) fn copy_fields(fields: &[Field], what: &str) -> Vec<Field> {
    fields
        .iter()
        .filter(|f| {
            let usable = !f.name().is_empty() && !f.is_unset();
            if !usable {
                log::warn!(
                    "[manager] ignoring unusable {} field '{}' ({})",
                    what,
                    f.name(),
                    f.field_type()
                );
            }
            usable
        })
        .cloned()
        .collect()
}

/// Composes generated messages for one specification version.
#[derive(Debug)]
pub(crate) struct MessagePopulator {
    version: u32,
    standard: Vec<Field>,
    heartbeat: Tier,
    log: Tier,
}

impl MessagePopulator {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            standard: Vec::new(),
            heartbeat: Tier::default(),
            log: Tier::default(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn is_legacy(&self) -> bool {
        self.version <= GMSEC_ISD_2014_00
    }

    // ------------------------------------------------------------------------
    // Tiers
    // ------------------------------------------------------------------------

    pub fn set_standard_fields(&mut self, fields: &[Field]) {
        self.standard = copy_fields(fields, "standard");
    }

    pub fn standard_fields(&self) -> &[Field] {
        &self.standard
    }

    /// Add every global standard field, replacing same-named fields.
    pub fn add_standard_fields(&self, msg: &mut Message) -> Result<()> {
        msg.add_fields(&self.standard)
    }

    pub fn set_heartbeat_tier(&mut self, subject: &str, fields: &[Field]) {
        self.heartbeat = Tier {
            subject: subject.to_string(),
            fields: copy_fields(fields, "heartbeat"),
        };
    }

    pub fn heartbeat_tier(&self) -> &Tier {
        &self.heartbeat
    }

    pub fn set_log_tier(&mut self, subject: &str, fields: &[Field]) {
        self.log = Tier {
            subject: subject.to_string(),
            fields: copy_fields(fields, "log"),
        };
    }

    pub fn log_tier(&self) -> &Tier {
        &self.log
    }

    /// Steps 1 to 3 of the composition order.
    pub fn compose(&self, msg: &mut Message, caller: &[Field], tier: &[Field]) -> Result<()> {
        for field in caller {
            msg.add_field(field.clone())?;
        }
        for field in tier.iter().chain(self.standard.iter()) {
            if !msg.has_field(field.name()) {
                msg.add_field(field.clone())?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Required fields
    // ------------------------------------------------------------------------

    /// HEADER-VERSION / CONTENT-VERSION for this version. `legacy_content` is
    /// the CONTENT-VERSION the 2014 ISD used for the message family.
    fn add_versions(&self, msg: &mut Message, legacy_content: f32) -> Result<()> {
        let (header, content) = match self.version {
            v if v <= GMSEC_ISD_2014_00 => (2010.0f32, legacy_content),
            v if v <= GMSEC_ISD_2016_00 => (2010.0, 2016.0),
            v if v <= GMSEC_ISD_2018_00 => (2018.0, 2018.0),
            _ => (2019.0, 2019.0),
        };
        msg.add(HEADER_VERSION, header)?;
        msg.add(CONTENT_VERSION, content)?;
        Ok(())
    }

    fn add_type(msg: &mut Message, msg_type: &str, subtype: &str) -> Result<()> {
        msg.add(MESSAGE_TYPE, msg_type)?;
        msg.add(MESSAGE_SUBTYPE, subtype)?;
        Ok(())
    }

    /// Integer field typed the way this version expects (I16 for 2014,
    /// U16 afterwards).
    pub fn counter_value(&self, value: u64) -> FieldValue {
        if self.is_legacy() {
            FieldValue::I16(value.min(i16::MAX as u64) as i16)
        } else {
            FieldValue::U16(value.min(u16::MAX as u64) as u16)
        }
    }

    /// Heartbeat message: MSG / C2CX / HB with COUNTER 1 and a default PUB-RATE.
    pub fn build_heartbeat(&self, subject: &str, fields: &[Field]) -> Result<Message> {
        let mut msg = Message::new(subject, MessageKind::Publish);
        self.compose(&mut msg, fields, &self.heartbeat.fields)?;
        self.populate_heartbeat(&mut msg)?;
        Ok(msg)
    }

    fn populate_heartbeat(&self, msg: &mut Message) -> Result<()> {
        Self::add_type(msg, "MSG", "C2CX")?;
        msg.add(C2CX_SUBTYPE, "HB")?;
        self.add_versions(msg, 2013.0)?;
        if !msg.has_field(PUB_RATE) {
            let rate = u64::from(crate::config::DEFAULT_HEARTBEAT_PUB_RATE_S);
            msg.add_field(Field::new(PUB_RATE, self.counter_value(rate)))?;
        }
        msg.add_field(Field::new(COUNTER, self.counter_value(1)))?;
        if self.is_legacy() {
            msg.add(MSG_ID, heartbeat_msg_id(1))?;
        }
        Ok(())
    }

    /// Log message: MSG / LOG with EVENT-TIME unless the caller set one.
    pub fn build_log(&self, subject: &str, fields: &[Field]) -> Result<Message> {
        let mut msg = Message::new(subject, MessageKind::Publish);
        self.compose(&mut msg, fields, &self.log.fields)?;
        Self::add_type(&mut msg, "MSG", "LOG")?;
        if !msg.has_field(EVENT_TIME) {
            msg.add(EVENT_TIME, event_time())?;
        }
        self.add_versions(&mut msg, 1.0)?;
        Ok(msg)
    }

    /// REQ / SERV request body.
    pub fn populate_simple_service(
        &self,
        msg: &mut Message,
        op_name: &str,
        op_number: &Field,
        params: &[ServiceParam],
    ) -> Result<()> {
        Self::add_type(msg, "REQ", "SERV")?;
        self.add_versions(msg, 2012.0)?;
        msg.add_field(Field::new(
            "NUM-OF-PARAMS",
            self.counter_value(params.len() as u64),
        ))?;
        if self.is_legacy() {
            msg.add(MSG_ID, unique_id())?;
        }
        if !op_name.is_empty() {
            msg.add("OPERATION-NAME", op_name)?;
        }
        msg.add("OPERATION-NUMBER", operation_number(op_number)?)?;

        for (i, param) in params.iter().enumerate() {
            let n = i + 1;
            msg.add(&format!("PARAM.{}.NAME", n), param.name())?;
            msg.add_field(param.value().renamed(format!("PARAM.{}.VALUE", n)))?;
        }
        Ok(())
    }

    /// REQ / DIR request body.
    pub fn populate_directive(&self, msg: &mut Message, directive: &Field) -> Result<()> {
        Self::add_type(msg, "REQ", "DIR")?;
        self.add_versions(msg, 1.0)?;
        if self.is_legacy() {
            msg.add(MSG_ID, unique_id())?;
        }
        msg.add_field(directive.clone())?;
        Ok(())
    }

    /// RESP / SERV acknowledgement body.
    pub fn populate_simple_service_ack(
        &self,
        msg: &mut Message,
        status: ResponseStatus,
    ) -> Result<()> {
        self.populate_ack(msg, "SERV", 2012.0, status)
    }

    /// RESP / DIR acknowledgement body.
    pub fn populate_directive_ack(&self, msg: &mut Message, status: ResponseStatus) -> Result<()> {
        self.populate_ack(msg, "DIR", 1.0, status)
    }

    fn populate_ack(
        &self,
        msg: &mut Message,
        subtype: &str,
        legacy_content: f32,
        status: ResponseStatus,
    ) -> Result<()> {
        Self::add_type(msg, "RESP", subtype)?;
        self.add_versions(msg, legacy_content)?;
        if self.is_legacy() {
            msg.add(MSG_ID, unique_id())?;
        }
        msg.add(RESPONSE_STATUS, status.as_i16())?;
        Ok(())
    }

    /// MSG / C2CX / RSRC static members.
    pub fn populate_resource(&self, msg: &mut Message, counter: u64) -> Result<()> {
        Self::add_type(msg, "MSG", "C2CX")?;
        msg.add(C2CX_SUBTYPE, "RSRC")?;
        self.add_versions(msg, 2010.0)?;
        let counter = if self.version <= GMSEC_ISD_2016_00 && !self.is_legacy() {
            FieldValue::U16(counter as u16)
        } else {
            FieldValue::I16(counter as u16 as i16)
        };
        msg.add_field(Field::new(COUNTER, counter))?;
        if self.is_legacy() {
            msg.add(MSG_ID, "GMSEC-RESOURCE-MESSAGE")?;
        }
        Ok(())
    }
}

fn operation_number(field: &Field) -> Result<i16> {
    let value = field.as_i64()?;
    i16::try_from(value).map_err(|_| {
        Error::ValueOutOfRange(format!(
            "OPERATION-NUMBER {} does not fit in a 16-bit integer",
            value
        ))
    })
}

/// MSG-ID of 2014 heartbeats.
pub(crate) fn heartbeat_msg_id(counter: u64) -> String {
    format!("GMSEC-C2CX-HB-{}", counter)
}

/// Current UTC time as `YYYY-DDD-HH:MM:SS.sss`.
pub(crate) fn event_time() -> String {
    chrono::Utc::now().format("%Y-%j-%H:%M:%S%.3f").to_string()
}

/// Process-unique id: `host.pid.nanos.sequence`.
pub(crate) fn unique_id() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!(
        "{}.{}.{}.{}",
        host_name(),
        std::process::id(),
        nanos,
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(unix)]
pub(crate) fn host_name() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for buf.len() bytes; gethostname NUL-terminates on success.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return "localhost".to_string();
    }
    let len = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[cfg(not(unix))]
pub(crate) fn host_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::specification::GMSEC_ISD_CURRENT;

    #[test]
    fn test_caller_beats_tier_beats_global() {
        let mut pop = MessagePopulator::new(GMSEC_ISD_CURRENT);
        pop.set_standard_fields(&[Field::new("A", 1i32), Field::new("G", "global")]);
        pop.set_heartbeat_tier("GMSEC.HB", &[Field::new("G", "tier"), Field::new("T", 1u8)]);

        let msg = pop.build_heartbeat("GMSEC.HB", &[Field::new("A", 2i32)]).unwrap();
        assert_eq!(msg.get_i64_value("A").unwrap(), 2);
        assert_eq!(msg.get_string_value("G").unwrap(), "tier");
        assert!(msg.has_field("T"));
        assert_eq!(msg.fields().filter(|f| f.name() == "A").count(), 1);
    }

    #[test]
    fn test_required_fields_win() {
        let pop = MessagePopulator::new(GMSEC_ISD_CURRENT);
        let msg = pop
            .build_heartbeat("GMSEC.HB", &[Field::new(MESSAGE_TYPE, "REQ"), Field::new(COUNTER, 99u16)])
            .unwrap();
        assert_eq!(msg.get_string_value(MESSAGE_TYPE).unwrap(), "MSG");
        assert_eq!(msg.get_i64_value(COUNTER).unwrap(), 1);
        assert_eq!(msg.schema_id().as_deref(), Some("MSG.C2CX.HB"));
        assert_eq!(msg.get_i64_value(PUB_RATE).unwrap(), 30);
    }

    #[test]
    fn test_legacy_heartbeat_types() {
        let pop = MessagePopulator::new(GMSEC_ISD_2014_00);
        let msg = pop.build_heartbeat("GMSEC.HB", &[]).unwrap();
        assert_eq!(msg.get_field(COUNTER).unwrap().field_type(), FieldType::I16);
        assert_eq!(msg.get_f64_value(CONTENT_VERSION).unwrap(), 2013.0);
        assert_eq!(msg.get_string_value(MSG_ID).unwrap(), "GMSEC-C2CX-HB-1");
    }

    #[test]
    fn test_log_keeps_caller_event_time() {
        let pop = MessagePopulator::new(GMSEC_ISD_2016_00);
        let msg = pop
            .build_log("GMSEC.LOG", &[Field::new(EVENT_TIME, "2020-001-00:00:00.000")])
            .unwrap();
        assert_eq!(
            msg.get_string_value(EVENT_TIME).unwrap(),
            "2020-001-00:00:00.000"
        );
        let generated = pop.build_log("GMSEC.LOG", &[]).unwrap();
        assert_eq!(generated.get_string_value(EVENT_TIME).unwrap().len(), 21);
        assert_eq!(generated.get_f64_value(HEADER_VERSION).unwrap(), 2010.0);
    }

    #[test]
    fn test_simple_service_params() {
        let pop = MessagePopulator::new(GMSEC_ISD_2018_00);
        let mut msg = Message::new("GMSEC.REQ.SERV", MessageKind::Request);
        let params = [
            ServiceParam::new("MODE", Field::new("ignored", "SAFE")),
            ServiceParam::new("LEVEL", Field::new("ignored", 3i32)),
        ];
        pop.populate_simple_service(&mut msg, "SET-MODE", &Field::new("N", 7i32), &params)
            .unwrap();
        assert_eq!(msg.get_string_value("OPERATION-NAME").unwrap(), "SET-MODE");
        assert_eq!(
            msg.get_field("OPERATION-NUMBER").unwrap().field_type(),
            FieldType::I16
        );
        assert_eq!(msg.get_field("NUM-OF-PARAMS").unwrap().field_type(), FieldType::U16);
        assert_eq!(msg.get_string_value("PARAM.2.NAME").unwrap(), "LEVEL");
        assert_eq!(msg.get_i64_value("PARAM.2.VALUE").unwrap(), 3);
        assert!(!msg.has_field(MSG_ID));
    }

    #[test]
    fn test_operation_number_range() {
        let pop = MessagePopulator::new(GMSEC_ISD_CURRENT);
        let mut msg = Message::new("GMSEC.REQ.SERV", MessageKind::Request);
        let err = pop
            .populate_simple_service(&mut msg, "", &Field::new("N", 70_000i32), &[])
            .unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange(_)));
    }

    #[test]
    fn test_ack_and_resource() {
        let pop = MessagePopulator::new(GMSEC_ISD_2014_00);
        let mut ack = Message::new("GMSEC.RESP.DIR", MessageKind::Reply);
        pop.populate_directive_ack(&mut ack, ResponseStatus::SuccessfulCompletion)
            .unwrap();
        assert_eq!(ack.get_i64_value(RESPONSE_STATUS).unwrap(), 3);
        assert!(ack.has_field(MSG_ID));

        let mut rsrc = Message::new("GMSEC.RSRC", MessageKind::Publish);
        pop.populate_resource(&mut rsrc, 5).unwrap();
        assert_eq!(rsrc.get_string_value(MSG_ID).unwrap(), "GMSEC-RESOURCE-MESSAGE");
        assert_eq!(rsrc.get_field(COUNTER).unwrap().field_type(), FieldType::I16);
    }

    #[test]
    fn test_unusable_tier_fields_are_dropped() {
        let mut pop = MessagePopulator::new(GMSEC_ISD_CURRENT);
        pop.set_standard_fields(&[Field::unset("EMPTY"), Field::new("OK", true)]);
        assert_eq!(pop.standard_fields().len(), 1);
    }

    #[test]
    fn test_unique_ids_differ() {
        assert_ne!(unique_id(), unique_id());
        assert_eq!(ResponseStatus::from_i16(6), Some(ResponseStatus::FinalMessage));
    }
}
