// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration options and crate-wide constants.
//!
//! [`Config`] is an ordered key/value store. Keys compare ASCII
//! case-insensitively (`mw-id` and `MW-ID` are the same option) and keep the
//! spelling and position of their first insertion.
//!
//! ```text
//! Config::from_args(["mw-id=loopback", "GMSEC-MSG-CONTENT-VALIDATE=true"])
//!   -> ConnectionManager::builder(config)
//!        validate_send  = true
//!        spec version   = 201900 (current)
//! ```

use crate::error::{Error, Result};

// ============================================================================
// Recognised option names
// ============================================================================

/// Enable validation of outgoing messages.
pub const MSG_CONTENT_VALIDATE: &str = "GMSEC-MSG-CONTENT-VALIDATE";
/// Enable validation of outgoing and incoming messages.
pub const MSG_CONTENT_VALIDATE_ALL: &str = "GMSEC-MSG-CONTENT-VALIDATE-ALL";
/// Enable validation of outgoing messages.
pub const MSG_CONTENT_VALIDATE_SEND: &str = "GMSEC-MSG-CONTENT-VALIDATE-SEND";
/// Enable validation of incoming messages.
pub const MSG_CONTENT_VALIDATE_RECV: &str = "GMSEC-MSG-CONTENT-VALIDATE-RECV";
/// Message specification version (e.g. `201900`).
pub const SPECIFICATION_VERSION: &str = "GMSEC-SPECIFICATION-VERSION";
/// Message specification schema level (0, 1 or 2).
pub const SCHEMA_LEVEL: &str = "GMSEC-SCHEMA-LEVEL";
/// Manager-wide default request republish interval in milliseconds.
pub const REQ_REPUBLISH_MS: &str = "GMSEC-REQ-REPUBLISH-MS";
/// Transport selector.
pub const MW_ID: &str = "mw-id";
/// Check subject syntax on publish and subscribe (default off).
pub const VALIDATE_SUBJECT: &str = "SEC-VAL-SUB";
/// Accept lowercase letters when checking subjects (default on).
pub const VALIDATE_SUBJECT_LENIENT: &str = "SEC-VAL-SUB-LENIENT";

// ============================================================================
// Timing constants
// ============================================================================

/// Default request republish interval when neither the call nor the config sets one.
pub const DEFAULT_REPUBLISH_MS: i32 = 60_000;
/// Smallest republish interval honoured; shorter positive values are raised to this.
pub const MIN_REPUBLISH_MS: i32 = 100;
/// Timeout value meaning "wait forever".
pub const WAIT_FOREVER: i32 = -1;
/// Republish interval meaning "never republish".
pub const REQUEST_PUBLISH_ONCE: i32 = -1;
/// How long `start_*_service` waits for the worker thread to report Running.
pub const SERVICE_START_TIMEOUT_MS: u64 = 10_000;
/// How long `stop_*_service` waits for the worker thread to report Stopped.
pub const SERVICE_STOP_TIMEOUT_MS: u64 = 3_000;
/// Heartbeat publish rate (seconds) used when no PUB-RATE field is supplied.
pub const DEFAULT_HEARTBEAT_PUB_RATE_S: u16 = 30;
/// Poll interval of the auto-dispatch thread.
pub const DISPATCH_POLL_MS: u64 = 100;

/// Ordered, case-insensitive key/value options.
///
/// Message-scoped configs are never transmitted over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    entries: Vec<(String, String)>,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `key=value` arguments; arguments without `=` are ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::new();
        for arg in args {
            if let Some((key, value)) = arg.as_ref().split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    config.set(key, value.trim());
                }
            }
        }
        config
    }

    /// Set (or replace) an option. Returns `true` if an existing value was replaced.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.position(key) {
            Some(idx) => {
                self.entries[idx].1 = value;
                true
            }
            None => {
                self.entries.push((key.to_string(), value));
                false
            }
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove an option. Returns `true` if it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Interpret an option as a boolean (`true/false`, `yes/no`, `on/off`, `1/0`).
    ///
    /// Unrecognised text yields `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => parse_bool(v).unwrap_or(default),
            None => default,
        }
    }

    /// Interpret an option as `i32`. A present but non-numeric value is an error.
    pub fn get_i32(&self, key: &str) -> Result<Option<i32>> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<i32>().map_err(|_| {
                    Error::Configuration(format!("{} must be an integer, got '{}'", key, v))
                })
            })
            .transpose()
    }

    /// Interpret an option as `u32`. A present but non-numeric value is an error.
    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<u32>().map_err(|_| {
                    Error::Configuration(format!(
                        "{} must be an unsigned integer, got '{}'",
                        key, v
                    ))
                })
            })
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every option of `other` into `self`, replacing duplicates.
    pub fn merge(&mut self, other: &Config) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    /// Render as `<CONFIG><PARAMETER NAME="k">v</PARAMETER>...</CONFIG>`.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<CONFIG>\n");
        for (k, v) in self.iter() {
            out.push_str("\t<PARAMETER NAME=\"");
            out.push_str(&crate::field::xml_escape(k));
            out.push_str("\">");
            out.push_str(&crate::field::xml_escape(v));
            out.push_str("</PARAMETER>\n");
        }
        out.push_str("</CONFIG>");
        out
    }

    /// Parse the form produced by [`to_xml`](Self::to_xml).
    #[cfg(feature = "text-formats")]
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| Error::Parse(format!("invalid config XML: {}", e)))?;
        Self::from_xml_node(doc.root_element())
    }

    #[cfg(feature = "text-formats")]
    pub(crate) fn from_xml_node(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !node.has_tag_name("CONFIG") {
            return Err(Error::Parse(format!(
                "expected <CONFIG> element, found <{}>",
                node.tag_name().name()
            )));
        }
        let mut config = Self::new();
        for param in node.children().filter(|n| n.has_tag_name("PARAMETER")) {
            let name = param
                .attribute("NAME")
                .ok_or_else(|| Error::Parse("PARAMETER without NAME attribute".into()))?;
            config.set(name, param.text().unwrap_or("").trim());
        }
        Ok(config)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

/// Parse the boolean spellings accepted by configuration values.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    let v = value.trim();
    if ["true", "yes", "on", "1"].iter().any(|t| v.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if ["false", "no", "off", "0"]
        .iter()
        .any(|t| v.eq_ignore_ascii_case(t))
    {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut cfg = Config::new();
        assert!(!cfg.set("mw-id", "loopback"));
        assert!(cfg.set("MW-ID", "bolt"));
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.get("Mw-Id"), Some("bolt"));
    }

    #[test]
    fn test_from_args_skips_malformed() {
        let cfg = Config::from_args(["mw-id=loopback", "garbage", "=x", "a = b "]);
        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.get("a"), Some("b"));
    }

    #[test]
    fn test_bool_spellings() {
        let cfg = Config::new()
            .with("a", "TRUE")
            .with("b", "no")
            .with("c", "maybe");
        assert!(cfg.get_bool("a", false));
        assert!(!cfg.get_bool("b", true));
        assert!(cfg.get_bool("c", true));
        assert!(!cfg.get_bool("missing", false));
    }

    #[test]
    fn test_numeric_getters() {
        let cfg = Config::new().with("n", "201600").with("bad", "abc");
        assert_eq!(cfg.get_i32("n").unwrap(), Some(201600));
        assert_eq!(cfg.get_u32("missing").unwrap(), None);
        assert!(cfg.get_i32("bad").is_err());
    }

    #[cfg(feature = "text-formats")]
    #[test]
    fn test_xml_round_trip() {
        let cfg = Config::new()
            .with("mw-id", "loopback")
            .with("note", "a<b & c");
        let parsed = Config::from_xml(&cfg.to_xml()).unwrap();
        assert_eq!(parsed, cfg);
    }
}
