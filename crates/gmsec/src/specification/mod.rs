// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message specification: version, schema level and compliance checks.
//!
//! The manager only talks to a [`Specification`] through this trait. The
//! crate ships [`FieldRuleSpecification`], a table of required/typed fields
//! per schema id, which custom [`MessageValidator`]s can extend.
//!
//! ```text
//! publish(msg)
//!   -> spec.validate_message(msg)
//!        header rules      (every message)
//!        schema rules      (by msg.schema_id(), e.g. MSG.C2CX.HB)
//!        custom validators (registration order)
//!   -> Err(Error::Validation(report)) lists every problem found
//! ```

mod rules;

pub use rules::{FieldKind, FieldRule, FieldRuleSpecification};

use crate::error::{Error, Result};
use crate::message::Message;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Versions
// ============================================================================

pub const GMSEC_ISD_2014_00: u32 = 201_400;
pub const GMSEC_ISD_2016_00: u32 = 201_600;
pub const GMSEC_ISD_2018_00: u32 = 201_800;
pub const GMSEC_ISD_2019_00: u32 = 201_900;
pub const GMSEC_ISD_CURRENT: u32 = GMSEC_ISD_2019_00;

/// Every version the populator and rule table know about.
pub const SUPPORTED_VERSIONS: [u32; 4] = [
    GMSEC_ISD_2014_00,
    GMSEC_ISD_2016_00,
    GMSEC_ISD_2018_00,
    GMSEC_ISD_2019_00,
];

/// Resolve a configured version string, falling back to the current version
/// (with a warning) when it is missing, malformed or unsupported.
pub fn resolve_version(value: Option<&str>) -> u32 {
    let Some(text) = value else {
        return GMSEC_ISD_CURRENT;
    };
    let digits: String = text.trim().chars().filter(|c| *c != '_').collect();
    match digits.parse::<u32>() {
        Ok(v) if SUPPORTED_VERSIONS.contains(&v) => v,
        _ => {
            log::warn!(
                "[spec] Invalid specification version '{}', defaulting to {}",
                text,
                GMSEC_ISD_CURRENT
            );
            GMSEC_ISD_CURRENT
        }
    }
}

/// Depth of schema checking requested by the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SchemaLevel {
    #[default]
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
}

impl SchemaLevel {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(SchemaLevel::Level0),
            1 => Some(SchemaLevel::Level1),
            2 => Some(SchemaLevel::Level2),
            _ => None,
        }
    }

    /// Resolve a configured level, defaulting to level 0 with a warning.
    pub fn resolve(value: Option<&str>) -> Self {
        let Some(text) = value else {
            return SchemaLevel::Level0;
        };
        text.trim()
            .parse::<u32>()
            .ok()
            .and_then(SchemaLevel::from_u32)
            .unwrap_or_else(|| {
                log::warn!("[spec] Invalid schema level '{}', defaulting to 0", text);
                SchemaLevel::Level0
            })
    }
}

// ============================================================================
// Validation report
// ============================================================================

/// One compliance problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending field, `None` for message-level problems.
    pub field: Option<String>,
    pub message: String,
}

/// Every problem found while validating one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    subject: String,
    schema_id: Option<String>,
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(msg: &Message) -> Self {
        Self {
            subject: msg.subject().to_string(),
            schema_id: msg.schema_id(),
            issues: Vec::new(),
        }
    }

    /// Record a problem with a named field.
    pub fn field_issue(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: Some(field.to_string()),
            message: message.into(),
        });
    }

    /// Record a message-level problem.
    pub fn issue(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: None,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// True when some issue names `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.issues
            .iter()
            .any(|i| i.field.as_deref() == Some(field))
    }

    /// `Ok(())` when empty, `Err(Error::Validation(self))` otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message '{}'", self.subject)?;
        if let Some(id) = &self.schema_id {
            write!(f, " (schema {})", id)?;
        }
        write!(f, " has {} problem(s)", self.issues.len())?;
        for issue in &self.issues {
            match &issue.field {
                Some(name) => write!(f, "\n\tField {}: {}", name, issue.message)?,
                None => write!(f, "\n\t{}", issue.message)?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Extra compliance check run after the built-in rules.
pub trait MessageValidator: Send + Sync {
    fn validate(&self, msg: &Message, report: &mut ValidationReport);
}

impl<F> MessageValidator for F
where
    F: Fn(&Message, &mut ValidationReport) + Send + Sync,
{
    fn validate(&self, msg: &Message, report: &mut ValidationReport) {
        self(msg, report)
    }
}

/// Specification contract consumed by the connection manager.
pub trait Specification: Send + Sync {
    fn version(&self) -> u32;

    fn schema_level(&self) -> SchemaLevel;

    /// `Err(Error::Validation(report))` when the message is not compliant.
    fn validate_message(&self, msg: &Message) -> Result<()>;

    fn register_message_validator(&self, validator: Arc<dyn MessageValidator>);
}
