// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{
    MessageValidator, SchemaLevel, Specification, ValidationReport, GMSEC_ISD_2014_00,
};
use crate::config::{self, Config};
use crate::error::Result;
use crate::field::{Field, FieldType};
use crate::message::Message;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Accepted types for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Exact(FieldType),
    /// Any signed or unsigned integer type.
    Integer,
    /// F32 or F64.
    Float,
    Any,
}

impl FieldKind {
    fn accepts(self, ty: FieldType) -> bool {
        match self {
            FieldKind::Exact(t) => t == ty,
            FieldKind::Integer => matches!(
                ty,
                FieldType::I8
                    | FieldType::U8
                    | FieldType::I16
                    | FieldType::U16
                    | FieldType::I32
                    | FieldType::U32
                    | FieldType::I64
                    | FieldType::U64
            ),
            FieldKind::Float => matches!(ty, FieldType::F32 | FieldType::F64),
            FieldKind::Any => true,
        }
    }

    fn describe(self) -> String {
        match self {
            FieldKind::Exact(t) => t.name().to_string(),
            FieldKind::Integer => "an integer type".to_string(),
            FieldKind::Float => "F32 or F64".to_string(),
            FieldKind::Any => "any type".to_string(),
        }
    }
}

/// Type (and presence) constraint on one named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }

    fn check(&self, field: Option<&Field>, report: &mut ValidationReport) {
        match field {
            None if self.required => report.field_issue(&self.name, "required field is missing"),
            None => {}
            Some(f) if !self.kind.accepts(f.field_type()) => report.field_issue(
                &self.name,
                format!(
                    "has type {}, expected {}",
                    f.field_type(),
                    self.kind.describe()
                ),
            ),
            Some(_) => {}
        }
    }
}

/// Rule-table specification.
///
/// Header rules apply to every message; schema rules are looked up by
/// [`Message::schema_id`]. Messages whose schema id has no entry are only
/// checked against the header rules.
pub struct FieldRuleSpecification {
    version: u32,
    level: SchemaLevel,
    header: Vec<FieldRule>,
    schemas: HashMap<String, Vec<FieldRule>>,
    validators: RwLock<Vec<Arc<dyn MessageValidator>>>,
}

impl FieldRuleSpecification {
    /// Built-in rules for the given version.
    pub fn new(version: u32, level: SchemaLevel) -> Self {
        let mut spec = Self::empty(version, level);
        spec.install_defaults();
        spec
    }

    /// No rules at all; every message is compliant until rules or
    /// validators are added.
    pub fn empty(version: u32, level: SchemaLevel) -> Self {
        Self {
            version,
            level,
            header: Vec::new(),
            schemas: HashMap::new(),
            validators: RwLock::new(Vec::new()),
        }
    }

    /// Version and level from `GMSEC-SPECIFICATION-VERSION` /
    /// `GMSEC-SCHEMA-LEVEL`, falling back to the current version and level 0.
    pub fn from_config(config: &Config) -> Self {
        let version = super::resolve_version(config.get(config::SPECIFICATION_VERSION));
        let level = SchemaLevel::resolve(config.get(config::SCHEMA_LEVEL));
        Self::new(version, level)
    }

    #[must_use]
    pub fn with_header_rule(mut self, rule: FieldRule) -> Self {
        self.header.retain(|r| r.name != rule.name);
        self.header.push(rule);
        self
    }

    #[must_use]
    pub fn with_schema_rule(mut self, schema_id: &str, rule: FieldRule) -> Self {
        let rules = self.schemas.entry(schema_id.to_string()).or_default();
        rules.retain(|r| r.name != rule.name);
        rules.push(rule);
        self
    }

    /// Schema ids with content rules, sorted.
    pub fn schema_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn install_defaults(&mut self) {
        use FieldKind::{Exact, Float, Integer};
        let string = Exact(FieldType::String);

        self.header = vec![
            FieldRule::required("HEADER-VERSION", Float),
            FieldRule::required("MESSAGE-TYPE", string),
            FieldRule::required("MESSAGE-SUBTYPE", string),
            FieldRule::required("MISSION-ID", string),
            FieldRule::required("FACILITY", string),
            FieldRule::required("COMPONENT", string),
            FieldRule::optional("CONSTELLATION-ID", string),
            FieldRule::optional("SAT-ID-PHYSICAL", string),
            FieldRule::optional("SAT-ID-LOGICAL", string),
            FieldRule::optional("DOMAIN1", string),
            FieldRule::optional("DOMAIN2", string),
            FieldRule::optional("NODE", string),
            FieldRule::optional("PROCESS-ID", Integer),
            FieldRule::optional("USER-NAME", string),
            FieldRule::optional("PUBLISH-TIME", string),
            FieldRule::optional("UNIQUE-ID", string),
        ];

        let content = FieldRule::required("CONTENT-VERSION", Float);
        let status = FieldRule::required("RESPONSE-STATUS", Exact(FieldType::I16));
        let response = FieldRule::required("RESPONSE", Exact(FieldType::Bool));

        self.schemas.insert(
            "MSG.C2CX.HB".into(),
            vec![
                content.clone(),
                FieldRule::required("C2CX-SUBTYPE", string),
                FieldRule::required("PUB-RATE", Integer),
                FieldRule::required("COUNTER", Integer),
                FieldRule::optional("COMPONENT-STATUS", Exact(FieldType::I16)),
                FieldRule::optional("COMPONENT-INFO", Exact(FieldType::I16)),
                FieldRule::optional("CPU-MEMORY", Float),
                FieldRule::optional("CPU-UTIL", Float),
            ],
        );
        self.schemas.insert(
            "MSG.C2CX.RSRC".into(),
            vec![
                content.clone(),
                FieldRule::required("C2CX-SUBTYPE", string),
                FieldRule::required("COUNTER", Integer),
                FieldRule::required("OPER-SYS", string),
            ],
        );
        self.schemas.insert(
            "MSG.LOG".into(),
            vec![
                content.clone(),
                FieldRule::required("SEVERITY", Exact(FieldType::I16)),
                FieldRule::required("MSG-TEXT", string),
                FieldRule::required("EVENT-TIME", string),
            ],
        );
        self.schemas.insert(
            "REQ.DIR".into(),
            vec![
                content.clone(),
                response.clone(),
                FieldRule::required("DIRECTIVE-STRING", string),
            ],
        );
        self.schemas.insert(
            "REQ.SERV".into(),
            vec![
                content.clone(),
                response,
                FieldRule::required("OPERATION-NUMBER", Exact(FieldType::I16)),
                FieldRule::required("NUM-OF-PARAMS", Integer),
                FieldRule::optional("OPERATION-NAME", string),
            ],
        );
        self.schemas
            .insert("RESP.DIR".into(), vec![content.clone(), status.clone()]);
        self.schemas
            .insert("RESP.SERV".into(), vec![content, status]);

        if self.version == GMSEC_ISD_2014_00 {
            for id in [
                "MSG.C2CX.HB",
                "MSG.C2CX.RSRC",
                "REQ.DIR",
                "REQ.SERV",
                "RESP.DIR",
                "RESP.SERV",
            ] {
                if let Some(rules) = self.schemas.get_mut(id) {
                    rules.push(FieldRule::required("MSG-ID", string));
                }
            }
        }
    }
}

impl Specification for FieldRuleSpecification {
    fn version(&self) -> u32 {
        self.version
    }

    fn schema_level(&self) -> SchemaLevel {
        self.level
    }

    fn validate_message(&self, msg: &Message) -> Result<()> {
        let mut report = ValidationReport::new(msg);

        for rule in &self.header {
            rule.check(msg.get_field(&rule.name), &mut report);
        }

        if let Some(id) = msg.schema_id() {
            match self.schemas.get(&id) {
                Some(rules) => {
                    for rule in rules {
                        rule.check(msg.get_field(&rule.name), &mut report);
                    }
                }
                None => log::trace!("[spec] No content rules for schema '{}'", id),
            }
        }

        for validator in self.validators.read().iter() {
            validator.validate(msg, &mut report);
        }

        report.into_result()
    }

    fn register_message_validator(&self, validator: Arc<dyn MessageValidator>) {
        self.validators.write().push(validator);
    }
}

impl std::fmt::Debug for FieldRuleSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRuleSpecification")
            .field("version", &self.version)
            .field("level", &self.level)
            .field("header_rules", &self.header.len())
            .field("schemas", &self.schema_ids())
            .field("validators", &self.validators.read().len())
            .finish()
    }
}
