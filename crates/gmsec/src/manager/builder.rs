// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection manager builder.
//!
//! Settings come from the [`Config`] first; builder calls override them.
//! Building never fails: malformed option values are logged and replaced
//! by their defaults, and transport problems surface from `initialize()`.

use super::populator::MessagePopulator;
use super::request::RequestTable;
use super::sampler::{ResourceSampler, ResourceWindow, SystemSampler};
use super::subscription::SubscriptionRegistry;
use super::{ConnectionManager, ManagerInner};
use crate::config::{
    self, Config, DEFAULT_REPUBLISH_MS, MSG_CONTENT_VALIDATE, MSG_CONTENT_VALIDATE_ALL,
    MSG_CONTENT_VALIDATE_RECV, MSG_CONTENT_VALIDATE_SEND, MW_ID, REQ_REPUBLISH_MS,
    VALIDATE_SUBJECT, VALIDATE_SUBJECT_LENIENT,
};
use crate::connection::{Connection, ConnectionFactory, LoopbackBus};
use crate::error::{Error, Result};
use crate::specification::{resolve_version, FieldRuleSpecification, SchemaLevel, Specification};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Builder for a [`ConnectionManager`].
///
/// # Example
/// ```rust
/// use gmsec::{Config, ConnectionManager, LoopbackBus, GMSEC_ISD_2016_00};
///
/// let bus = LoopbackBus::new();
/// let mgr = ConnectionManager::builder(Config::new())
///     .validate(true)
///     .specification_version(GMSEC_ISD_2016_00)
///     .loopback(&bus)
///     .build();
/// assert_eq!(mgr.specification().version(), GMSEC_ISD_2016_00);
/// ```
pub struct ConnectionManagerBuilder {
    config: Config,
    validate: Option<bool>,
    specification_version: Option<u32>,
    specification: Option<Arc<dyn Specification>>,
    factory: Option<Arc<dyn ConnectionFactory>>,
    sampler: Option<Arc<dyn ResourceSampler>>,
}

impl ConnectionManagerBuilder {
    pub(super) fn new(config: Config) -> Self {
        Self {
            config,
            validate: None,
            specification_version: None,
            specification: None,
            factory: None,
            sampler: None,
        }
    }

    /// Validate outgoing messages (overrides `GMSEC-MSG-CONTENT-VALIDATE`).
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = Some(enabled);
        self
    }

    /// Specification version for the built-in rule table (overrides
    /// `GMSEC-SPECIFICATION-VERSION`).
    pub fn specification_version(mut self, version: u32) -> Self {
        self.specification_version = Some(version);
        self
    }

    /// Use a custom specification instead of the built-in rule table.
    pub fn specification(mut self, specification: Arc<dyn Specification>) -> Self {
        self.specification = Some(specification);
        self
    }

    /// Transport factory used by `initialize()`.
    pub fn factory(mut self, factory: Arc<dyn ConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Connect through `bus`.
    pub fn loopback(self, bus: &LoopbackBus) -> Self {
        self.factory(bus.factory())
    }

    /// Host statistics source for resource messages.
    pub fn sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn build(self) -> ConnectionManager {
        let cfg = &self.config;
        let validate_all = cfg.get_bool(MSG_CONTENT_VALIDATE_ALL, false);
        let validate_send = self
            .validate
            .unwrap_or_else(|| cfg.get_bool(MSG_CONTENT_VALIDATE, false))
            || cfg.get_bool(MSG_CONTENT_VALIDATE_SEND, false)
            || validate_all;
        let validate_recv = cfg.get_bool(MSG_CONTENT_VALIDATE_RECV, false) || validate_all;

        let default_republish_ms = match cfg.get_i32(REQ_REPUBLISH_MS) {
            Ok(Some(ms)) => ms,
            Ok(None) => DEFAULT_REPUBLISH_MS,
            Err(e) => {
                log::warn!("[manager] {}; using {} ms", e, DEFAULT_REPUBLISH_MS);
                DEFAULT_REPUBLISH_MS
            }
        };

        let specification = self.specification.unwrap_or_else(|| {
            let version = self
                .specification_version
                .map(|v| resolve_version(Some(v.to_string().as_str())))
                .unwrap_or_else(|| resolve_version(cfg.get(config::SPECIFICATION_VERSION)));
            let level = SchemaLevel::resolve(cfg.get(config::SCHEMA_LEVEL));
            let rules: Arc<dyn Specification> = Arc::new(FieldRuleSpecification::new(version, level));
            rules
        });

        let id = NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "[manager] manager {} built (spec {}, validate send={} recv={})",
            id,
            specification.version(),
            validate_send,
            validate_recv
        );

        let inner = ManagerInner {
            id,
            check_subjects: cfg.get_bool(VALIDATE_SUBJECT, false),
            lenient_subjects: cfg.get_bool(VALIDATE_SUBJECT_LENIENT, true),
            populator: Mutex::new(MessagePopulator::new(specification.version())),
            specification,
            factory: self.factory.unwrap_or_else(default_factory),
            sampler: self.sampler.unwrap_or_else(system_sampler),
            validate_send,
            validate_recv,
            default_republish_ms,
            op_lock: Mutex::new(()),
            connection: RwLock::new(None),
            subscriptions: Mutex::new(SubscriptionRegistry::new(id)),
            events: Mutex::default(),
            requests: Arc::new(RequestTable::default()),
            dispatcher: Mutex::new(None),
            heartbeat: Mutex::new(None),
            resource: Mutex::new(None),
            resource_window: Mutex::new(ResourceWindow::new(1)),
            resource_counter: AtomicU64::new(0),
            config: self.config,
        };

        ConnectionManager {
            inner: Arc::new(inner),
            owner: true,
        }
    }
}

fn system_sampler() -> Arc<dyn ResourceSampler> {
    Arc::new(SystemSampler::default())
}

/// Transport chosen by `mw-id`: the loopback when absent or `loopback`.
fn default_factory() -> Arc<dyn ConnectionFactory> {
    let bus = LoopbackBus::new();
    Arc::new(
        move |config: &Config| -> Result<Box<dyn Connection>> {
            match config.get(MW_ID) {
                None => Ok(Box::new(bus.connection())),
                Some(id) if id.eq_ignore_ascii_case("loopback") => Ok(Box::new(bus.connection())),
                Some(other) => Err(Error::Configuration(format!(
                    "No transport available for mw-id '{}'; supply a ConnectionFactory",
                    other
                ))),
            }
        },
    )
}
