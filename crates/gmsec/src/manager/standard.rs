// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard message families: heartbeat, log, simple service, directive
//! and resource messages, plus the two periodic services.
//!
//! Every generated message is composed in the same order:
//!
//! ```text
//! 1. caller fields            always kept
//! 2. tier fields (HB / LOG)   only if absent
//! 3. global standard fields   only if absent
//! 4. required fields          overwrite (EVENT-TIME kept when the caller set it)
//! ```

use super::heartbeat::{HeartbeatService, Publisher};
use super::populator::{MessagePopulator, MSG_TEXT, OPER_SYS, PUB_RATE, RESPONSE, SEVERITY};
use super::resource::{PublishTick, ResourceService, SampleTick};
use super::sampler::ResourceWindow;
use super::{ConnectionManager, ManagerInner, ReplyCallback, ResponseStatus, ServiceParam};
use crate::config::{DEFAULT_HEARTBEAT_PUB_RATE_S, SERVICE_STOP_TIMEOUT_MS};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::message::{Message, MessageKind};
use crate::specification::GMSEC_ISD_2014_00;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Parameters of a simple-service request.
///
/// ```rust
/// use gmsec::{Field, ServiceParam, SimpleService};
///
/// let svc = SimpleService::new("GMSEC.M.SAT.REQ.SERV.ON", "POWER-ON", Field::new("OP", 7i16))
///     .with_param(ServiceParam::new("UNIT", Field::new("V", 3i16)));
/// assert_eq!(svc.params().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleService {
    subject: String,
    operation_name: String,
    operation_number: Field,
    fields: Vec<Field>,
    params: Vec<ServiceParam>,
}

impl SimpleService {
    pub fn new(
        subject: impl Into<String>,
        operation_name: impl Into<String>,
        operation_number: Field,
    ) -> Self {
        Self {
            subject: subject.into(),
            operation_name: operation_name.into(),
            operation_number,
            fields: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Extra caller field (header identity, etc.).
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: &[Field]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: ServiceParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn operation_number(&self) -> &Field {
        &self.operation_number
    }

    pub fn params(&self) -> &[ServiceParam] {
        &self.params
    }
}

fn check_sampling(sample_s: u64, average_s: u64) -> Result<()> {
    if sample_s == 0 {
        return Err(Error::ResourceSampling(
            "A sample rate of zero was used.".into(),
        ));
    }
    if average_s < sample_s {
        return Err(Error::ResourceSampling(
            "A moving average interval less than the sampling interval was used.".into(),
        ));
    }
    Ok(())
}

fn is_legacy(populator: &MessagePopulator) -> bool {
    populator.version() <= GMSEC_ISD_2014_00
}

impl ManagerInner {
    fn take_sample(&self) {
        match self.sampler.sample() {
            Ok(sample) => self.resource_window.lock().push(sample),
            Err(e) => log::warn!("[resource] sampling failed: {}", e),
        }
    }

    /// Resource message from the current moving-average window.
    fn build_resource(&self, subject: &str) -> Result<Message> {
        let counter = self.resource_counter.fetch_add(1, Ordering::AcqRel) % (i16::MAX as u64) + 1;
        self.resource_message(subject, counter)
    }

    fn resource_message(&self, subject: &str, counter: u64) -> Result<Message> {
        let mut msg = Message::new(subject, MessageKind::Publish);
        let legacy = {
            let populator = self.populator.lock();
            populator.compose(&mut msg, &[], &[])?;
            populator.populate_resource(&mut msg, counter)?;
            is_legacy(&populator)
        };
        msg.add(OPER_SYS, self.sampler.os_version())?;
        self.resource_window.lock().add_fields(&mut msg, legacy)?;
        Ok(msg)
    }
}

impl ConnectionManager {
    // ========================================================================
    // Heartbeat
    // ========================================================================

    /// Heartbeat message for `subject`; not published.
    pub fn create_heartbeat_message(&self, subject: &str, fields: &[Field]) -> Result<Message> {
        self.check_subject(subject)?;
        self.inner.populator.lock().build_heartbeat(subject, fields)
    }

    /// Start publishing heartbeats every PUB-RATE seconds (30 when `fields`
    /// has none). With validation enabled the first heartbeat is validated
    /// before the worker starts.
    pub fn start_heartbeat_service(&self, subject: &str, fields: &[Field]) -> Result<()> {
        self.start_heartbeat(subject, fields.to_vec())
    }

    /// [`Self::start_heartbeat_service`] with an explicit publish rate.
    pub fn start_heartbeat_service_at(
        &self,
        subject: &str,
        fields: &[Field],
        pub_rate_s: u16,
    ) -> Result<()> {
        let rate = self
            .inner
            .populator
            .lock()
            .counter_value(u64::from(pub_rate_s));
        let mut all = fields.to_vec();
        all.retain(|f| f.name() != PUB_RATE);
        all.push(Field::new(PUB_RATE, rate));
        self.start_heartbeat(subject, all)
    }

    fn start_heartbeat(&self, subject: &str, fields: Vec<Field>) -> Result<()> {
        self.inner.connection()?;
        self.check_subject(subject)?;

        let mut slot = self.inner.heartbeat.lock();
        if slot.as_ref().is_some_and(HeartbeatService::is_running) {
            return Err(Error::HeartbeatServiceIsRunning);
        }

        let (prototype, legacy) = {
            let populator = self.inner.populator.lock();
            (
                populator.build_heartbeat(subject, &fields)?,
                is_legacy(&populator),
            )
        };
        let rate = prototype
            .get_field(PUB_RATE)
            .map(Field::as_i64)
            .transpose()?
            .unwrap_or(i64::from(DEFAULT_HEARTBEAT_PUB_RATE_S));
        if rate <= 0 {
            return Err(Error::Configuration(
                "PUB-RATE must be greater than zero".into(),
            ));
        }
        self.validate_exact(&prototype)?;

        let manager = Arc::downgrade(&self.inner);
        let publisher: Publisher = Arc::new(move |msg: &Message| {
            let inner = manager.upgrade().ok_or(Error::NotInitialized)?;
            inner.publish_unchecked(msg)
        });
        let service = HeartbeatService::start(
            prototype,
            Duration::from_secs(rate as u64),
            legacy,
            publisher,
        )?;

        self.inner
            .populator
            .lock()
            .set_heartbeat_tier(subject, &fields);
        *slot = Some(service);
        log::debug!("[manager] heartbeat service started on {}", subject);
        Ok(())
    }

    /// Stop the heartbeat service.
    ///
    /// If the worker does not acknowledge in time the service is left
    /// running and `HeartbeatServiceIsRunning` is returned; call again later.
    pub fn stop_heartbeat_service(&self) -> Result<()> {
        let mut slot = self.inner.heartbeat.lock();
        let Some(service) = slot.as_mut() else {
            return Err(Error::HeartbeatServiceNotRunning(
                "HeartbeatService is not running!".into(),
            ));
        };
        if !service.stop(Duration::from_millis(SERVICE_STOP_TIMEOUT_MS)) {
            return Err(Error::HeartbeatServiceIsRunning);
        }
        *slot = None;
        Ok(())
    }

    pub fn heartbeat_service_running(&self) -> bool {
        self.inner
            .heartbeat
            .lock()
            .as_ref()
            .is_some_and(HeartbeatService::is_running)
    }

    /// Set a field of the running heartbeat; effective from the next cycle.
    /// Returns `true` when a field of that name was replaced.
    pub fn set_heartbeat_service_field(&self, field: &Field) -> Result<bool> {
        let slot = self.inner.heartbeat.lock();
        let service = slot
            .as_ref()
            .filter(|s| s.is_running())
            .ok_or_else(|| {
                Error::HeartbeatServiceNotRunning("HeartbeatService is not running!".into())
            })?;
        service.set_field(field, |probe| self.validate_exact(probe))
    }

    pub fn change_component_status(&self, status: i16) -> Result<bool> {
        self.set_heartbeat_service_field(&Field::new("COMPONENT-STATUS", status))
    }

    pub fn change_component_info(&self, info: i16) -> Result<bool> {
        self.set_heartbeat_service_field(&Field::new("COMPONENT-INFO", info))
    }

    pub fn change_cpu_memory(&self, memory: f32) -> Result<bool> {
        self.set_heartbeat_service_field(&Field::new("CPU-MEMORY", memory))
    }

    pub fn change_cpu_util(&self, util: f32) -> Result<bool> {
        self.set_heartbeat_service_field(&Field::new("CPU-UTIL", util))
    }

    // ========================================================================
    // Log
    // ========================================================================

    /// Subject and default fields used by [`Self::publish_log`].
    pub fn set_logging_defaults(&self, subject: &str, fields: &[Field]) -> Result<()> {
        self.check_subject(subject)?;
        self.inner.populator.lock().set_log_tier(subject, fields);
        Ok(())
    }

    /// Log message for `subject`; not published.
    pub fn create_log_message(&self, subject: &str, fields: &[Field]) -> Result<Message> {
        self.check_subject(subject)?;
        self.inner.populator.lock().build_log(subject, fields)
    }

    /// Publish a log message with MSG-TEXT `text` on the logging subject.
    pub fn publish_log(&self, text: &str, severity: i16) -> Result<()> {
        if text.is_empty() {
            return Err(Error::UninitializedObject(
                "The log message string is null, or empty.".into(),
            ));
        }
        let mut msg = {
            let populator = self.inner.populator.lock();
            let subject = populator.log_tier().subject.clone();
            if subject.is_empty() {
                return Err(Error::UninitializedObject(
                    "No logging subject; call set_logging_defaults() first.".into(),
                ));
            }
            populator.build_log(&subject, &[])?
        };
        msg.add(SEVERITY, severity)?;
        msg.add(MSG_TEXT, text)?;
        self.publish(&msg)
    }

    // ========================================================================
    // Simple service
    // ========================================================================

    fn build_service(&self, svc: &SimpleService, kind: MessageKind) -> Result<Message> {
        self.check_subject(&svc.subject)?;
        let mut msg = Message::new(svc.subject.as_str(), kind);
        {
            let populator = self.inner.populator.lock();
            populator.compose(&mut msg, &svc.fields, &[])?;
            populator.populate_simple_service(
                &mut msg,
                &svc.operation_name,
                &svc.operation_number,
                &svc.params,
            )?;
        }
        msg.add(RESPONSE, kind == MessageKind::Request)?;
        Ok(msg)
    }

    /// Publish a service request that expects no response.
    pub fn request_simple_service(&self, svc: &SimpleService) -> Result<()> {
        let msg = self.build_service(svc, MessageKind::Publish)?;
        self.publish(&msg)
    }

    pub fn request_simple_service_with_callback(
        &self,
        svc: &SimpleService,
        timeout_ms: i32,
        callback: Arc<dyn ReplyCallback>,
        republish_ms: i32,
    ) -> Result<()> {
        let msg = self.build_service(svc, MessageKind::Request)?;
        self.request_with_callback(&msg, timeout_ms, callback, republish_ms)
    }

    /// Blocking service request; `Ok(None)` on timeout.
    pub fn request_simple_service_reply(
        &self,
        svc: &SimpleService,
        timeout_ms: i32,
        republish_ms: i32,
    ) -> Result<Option<Message>> {
        let msg = self.build_service(svc, MessageKind::Request)?;
        self.request(&msg, timeout_ms, republish_ms)
    }

    /// Reply to a service request with a RESP/SERV message.
    pub fn acknowledge_simple_service(
        &self,
        subject: &str,
        request: &Message,
        status: ResponseStatus,
        fields: &[Field],
    ) -> Result<()> {
        self.check_subject(subject)?;
        let mut ack = Message::new(subject, MessageKind::Reply);
        {
            let populator = self.inner.populator.lock();
            populator.compose(&mut ack, fields, &[])?;
            populator.populate_simple_service_ack(&mut ack, status)?;
        }
        self.reply(request, &ack)
    }

    // ========================================================================
    // Directive
    // ========================================================================

    fn build_directive(
        &self,
        subject: &str,
        directive: &Field,
        fields: &[Field],
        kind: MessageKind,
    ) -> Result<Message> {
        self.check_subject(subject)?;
        let mut msg = Message::new(subject, kind);
        {
            let populator = self.inner.populator.lock();
            populator.compose(&mut msg, fields, &[])?;
            populator.populate_directive(&mut msg, directive)?;
        }
        msg.add(RESPONSE, kind == MessageKind::Request)?;
        Ok(msg)
    }

    /// Publish a directive that expects no response.
    pub fn request_directive(&self, subject: &str, directive: &Field, fields: &[Field]) -> Result<()> {
        let msg = self.build_directive(subject, directive, fields, MessageKind::Publish)?;
        self.publish(&msg)
    }

    pub fn request_directive_with_callback(
        &self,
        subject: &str,
        directive: &Field,
        fields: &[Field],
        timeout_ms: i32,
        callback: Arc<dyn ReplyCallback>,
        republish_ms: i32,
    ) -> Result<()> {
        let msg = self.build_directive(subject, directive, fields, MessageKind::Request)?;
        self.request_with_callback(&msg, timeout_ms, callback, republish_ms)
    }

    /// Blocking directive request; `Ok(None)` on timeout.
    pub fn request_directive_reply(
        &self,
        subject: &str,
        directive: &Field,
        fields: &[Field],
        timeout_ms: i32,
        republish_ms: i32,
    ) -> Result<Option<Message>> {
        let msg = self.build_directive(subject, directive, fields, MessageKind::Request)?;
        self.request(&msg, timeout_ms, republish_ms)
    }

    /// Reply to a directive with a RESP/DIR message.
    pub fn acknowledge_directive_request(
        &self,
        subject: &str,
        request: &Message,
        status: ResponseStatus,
        fields: &[Field],
    ) -> Result<()> {
        self.check_subject(subject)?;
        let mut ack = Message::new(subject, MessageKind::Reply);
        {
            let populator = self.inner.populator.lock();
            populator.compose(&mut ack, fields, &[])?;
            populator.populate_directive_ack(&mut ack, status)?;
        }
        self.reply(request, &ack)
    }

    // ========================================================================
    // Resource
    // ========================================================================

    /// Resource message averaging the last `average_s / sample_s` samples,
    /// taking one new sample now. COUNTER increments on every call.
    pub fn create_resource_message(
        &self,
        subject: &str,
        sample_s: u64,
        average_s: u64,
    ) -> Result<Message> {
        self.check_subject(subject)?;
        check_sampling(sample_s, average_s)?;
        self.inner
            .resource_window
            .lock()
            .resize(ResourceWindow::capacity_for(sample_s, average_s));
        self.inner.take_sample();
        self.inner.build_resource(subject)
    }

    pub fn publish_resource_message(
        &self,
        subject: &str,
        sample_s: u64,
        average_s: u64,
    ) -> Result<()> {
        let msg = self.create_resource_message(subject, sample_s, average_s)?;
        self.publish(&msg)
    }

    /// Publish a resource message every `interval_s`, sampling every
    /// `sample_s` into a moving average over `average_s`.
    pub fn start_resource_message_service(
        &self,
        subject: &str,
        interval_s: u64,
        sample_s: u64,
        average_s: u64,
    ) -> Result<()> {
        self.inner.connection()?;
        self.check_subject(subject)?;
        check_sampling(sample_s, average_s)?;
        if interval_s == 0 {
            return Err(Error::ResourceSampling(
                "A publish interval of zero was used.".into(),
            ));
        }

        let mut slot = self.inner.resource.lock();
        if slot.as_ref().is_some_and(ResourceService::is_running) {
            return Err(Error::ResourceServiceIsRunning);
        }
        self.inner
            .resource_window
            .lock()
            .resize(ResourceWindow::capacity_for(sample_s, average_s));

        // Template check; leaves COUNTER untouched.
        let template = self.inner.resource_message(subject, 1)?;
        if let Err(e) = self.validate_outgoing(&template) {
            log::warn!("[manager] resource service on {} not started: {}", subject, e);
            return Err(e);
        }

        let sampling = Arc::downgrade(&self.inner);
        let on_sample: SampleTick = Box::new(move || {
            if let Some(inner) = sampling.upgrade() {
                inner.take_sample();
            }
        });
        let publishing = Arc::downgrade(&self.inner);
        let subject = subject.to_string();
        let on_publish: PublishTick = Box::new(move || {
            let inner = publishing.upgrade().ok_or(Error::NotInitialized)?;
            let msg = inner.build_resource(&subject)?;
            ConnectionManager::borrowed(inner).publish(&msg)
        });

        *slot = Some(ResourceService::start(
            Duration::from_secs(interval_s),
            Duration::from_secs(sample_s),
            on_sample,
            on_publish,
        )?);
        Ok(())
    }

    /// Stop the resource service. `false` when none was started.
    pub fn stop_resource_message_service(&self) -> bool {
        let mut slot = self.inner.resource.lock();
        let Some(service) = slot.as_mut() else {
            return false;
        };
        if service.stop(Duration::from_millis(SERVICE_STOP_TIMEOUT_MS)) {
            *slot = None;
        }
        true
    }

    pub fn resource_service_running(&self) -> bool {
        self.inner
            .resource
            .lock()
            .as_ref()
            .is_some_and(ResourceService::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::manager::{ResourceSample, ResourceSampler};

    struct FixedSampler;

    impl ResourceSampler for FixedSampler {
        fn sample(&self) -> Result<ResourceSample> {
            Ok(ResourceSample {
                cpu_total_util: 50.0,
                cpu_util: vec![40.0, 60.0],
                mem_physical_total: 1 << 30,
                mem_physical_avail: 1 << 29,
                ..ResourceSample::default()
            })
        }

        fn os_version(&self) -> String {
            "OS version:  test".into()
        }
    }

    fn manager() -> ConnectionManager {
        let mgr = ConnectionManager::builder(Config::new())
            .loopback(&crate::connection::LoopbackBus::new())
            .sampler(Arc::new(FixedSampler))
            .build();
        mgr.initialize().unwrap();
        mgr
    }

    #[test]
    fn test_sampling_arguments() {
        let mgr = manager();
        assert!(matches!(
            mgr.create_resource_message("GMSEC.R", 0, 10),
            Err(Error::ResourceSampling(_))
        ));
        assert!(matches!(
            mgr.create_resource_message("GMSEC.R", 5, 4),
            Err(Error::ResourceSampling(_))
        ));
    }

    #[test]
    fn test_resource_counter_increments() {
        let mgr = manager();
        let first = mgr.create_resource_message("GMSEC.R", 1, 10).unwrap();
        let second = mgr.create_resource_message("GMSEC.R", 1, 10).unwrap();
        assert_eq!(first.get_i64_value("COUNTER").unwrap(), 1);
        assert_eq!(second.get_i64_value("COUNTER").unwrap(), 2);
        assert_eq!(first.get_string_value("OPER-SYS").unwrap(), "OS version:  test");
        assert_eq!(first.schema_id().as_deref(), Some("MSG.C2CX.RSRC"));
    }

    #[test]
    fn test_service_messages_carry_response_flag() {
        let mgr = manager();
        let svc = SimpleService::new("GMSEC.S", "OP", Field::new("N", 4i16));
        let publish = mgr.build_service(&svc, MessageKind::Publish).unwrap();
        let request = mgr.build_service(&svc, MessageKind::Request).unwrap();
        assert!(!publish.get_bool_value("RESPONSE").unwrap());
        assert!(request.get_bool_value("RESPONSE").unwrap());
        assert_eq!(request.get_i64_value("OPERATION-NUMBER").unwrap(), 4);

        let dir = mgr
            .build_directive(
                "GMSEC.D",
                &Field::new("DIRECTIVE-STRING", "RESET"),
                &[],
                MessageKind::Request,
            )
            .unwrap();
        assert_eq!(dir.schema_id().as_deref(), Some("REQ.DIR"));
    }

    #[test]
    fn test_publish_log_needs_text_and_subject() {
        let mgr = manager();
        assert!(matches!(
            mgr.publish_log("", 1),
            Err(Error::UninitializedObject(_))
        ));
        assert!(matches!(
            mgr.publish_log("hello", 1),
            Err(Error::UninitializedObject(_))
        ));
        mgr.set_logging_defaults("GMSEC.M.LOG", &[]).unwrap();
        assert!(mgr.publish_log("hello", 1).is_ok());
    }

    #[test]
    fn test_stop_without_services() {
        let mgr = manager();
        assert!(!mgr.stop_resource_message_service());
        assert!(matches!(
            mgr.stop_heartbeat_service(),
            Err(Error::HeartbeatServiceNotRunning(_))
        ));
        assert!(matches!(
            mgr.set_heartbeat_service_field(&Field::new("X", 1i16)),
            Err(Error::HeartbeatServiceNotRunning(_))
        ));
    }

    #[test]
    fn test_heartbeat_rate_must_be_positive() {
        let mgr = manager();
        let zero = Field::new(PUB_RATE, 0i16);
        assert!(matches!(
            mgr.start_heartbeat_service("GMSEC.HB", &[zero]),
            Err(Error::Configuration(_))
        ));
        assert!(!mgr.heartbeat_service_running());
    }
}
