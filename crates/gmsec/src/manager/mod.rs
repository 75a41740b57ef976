// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection manager: the application-facing façade over a [`Connection`].
//!
//! ```text
//!                      ┌──────────── ConnectionManager ─────────────┐
//!  publish/request ──> │ subject check ─> op_lock { validate, send } │ ──> Connection
//!                      │                                             │
//!  callbacks    <───── │ SubscriptionRegistry <── dispatch/receive   │ <── Connection
//!                      │ RequestTable         <── reply sink         │
//!                      │ EventRegistry        <── event sink         │
//!                      │                                             │
//!                      │ MessagePopulator (standard field tiers)     │
//!                      │ HeartbeatService / ResourceService threads  │
//!                      └─────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! `build()` never touches the transport. [`ConnectionManager::initialize`]
//! creates and connects it; [`ConnectionManager::cleanup`] stops the services
//! and auto-dispatch, releases every subscription and outstanding request,
//! then disconnects. Both are safe to call repeatedly. Dropping the manager
//! runs `cleanup()`.
//!
//! # Dispatch modes
//!
//! Messages for subscriptions with callbacks are delivered either by the
//! auto-dispatch thread ([`ConnectionManager::start_auto_dispatch`]) or by
//! the caller pairing [`ConnectionManager::receive`] with
//! [`ConnectionManager::dispatch`]. Using both on one manager at the same
//! time is not supported: each message goes to whichever receive call
//! dequeued it.
//!
//! # Example
//!
//! ```rust
//! use gmsec::{Config, ConnectionManager, Field, Message, MessageKind};
//!
//! let mgr = ConnectionManager::loopback(Config::new());
//! mgr.initialize()?;
//! mgr.set_standard_fields(&[Field::new("MISSION-ID", "M1")]);
//!
//! let _sub = mgr.subscribe("GMSEC.TEST.>")?;
//! let mut msg = Message::new("GMSEC.TEST.PUB", MessageKind::Publish);
//! mgr.add_standard_fields(&mut msg)?;
//! mgr.publish(&msg)?;
//!
//! let received = mgr.receive(1000)?.expect("delivered");
//! assert_eq!(received.get_string_value("MISSION-ID")?, "M1");
//! mgr.cleanup()?;
//! # Ok::<(), gmsec::Error>(())
//! ```

mod builder;
mod callback;
mod dispatch;
mod heartbeat;
mod populator;
mod request;
mod resource;
mod sampler;
mod service;
mod standard;
mod subscription;

pub use builder::ConnectionManagerBuilder;
pub use callback::{EventCallback, MessageCallback, ReplyCallback};
pub use populator::{ResponseStatus, ServiceParam};
pub use sampler::{DiskSample, NetPortSample, ResourceSample, ResourceSampler, SystemSampler};
pub use standard::SimpleService;
pub use subscription::SubscriptionInfo;

use crate::config::Config;
use crate::connection::{
    Connection, ConnectionEvent, ConnectionFactory, ConnectionState, EventSink, LoopbackBus,
};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::message::{Message, MessageKind};
use crate::specification::Specification;
use crate::subject;
use callback::{guarded, EventRegistry};
use dispatch::AutoDispatcher;
use heartbeat::HeartbeatService;
use parking_lot::{Mutex, RwLock};
use populator::MessagePopulator;
use request::{resolve_republish, Outcome, RequestTable};
use resource::ResourceService;
use sampler::ResourceWindow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use subscription::SubscriptionRegistry;

/// Identity fields filled with a placeholder before validating an outgoing
/// message, since the transport may stamp them itself.
const FILL_FIELDS: [&str; 3] = ["MISSION-ID", "FACILITY", "COMPONENT"];
const FILL_VALUE: &str = "FILL";

/// State shared between the manager handle, its callbacks and its workers.
pub(crate) struct ManagerInner {
    id: u64,
    config: Config,
    specification: Arc<dyn Specification>,
    factory: Arc<dyn ConnectionFactory>,
    sampler: Arc<dyn ResourceSampler>,
    validate_send: bool,
    validate_recv: bool,
    check_subjects: bool,
    lenient_subjects: bool,
    default_republish_ms: i32,
    /// Held around validate + transport call; never while blocking on receive.
    op_lock: Mutex<()>,
    connection: RwLock<Option<Arc<dyn Connection>>>,
    populator: Mutex<MessagePopulator>,
    subscriptions: Mutex<SubscriptionRegistry>,
    events: Mutex<EventRegistry>,
    requests: Arc<RequestTable>,
    dispatcher: Mutex<Option<AutoDispatcher>>,
    heartbeat: Mutex<Option<HeartbeatService>>,
    resource: Mutex<Option<ResourceService>>,
    resource_window: Mutex<ResourceWindow>,
    resource_counter: AtomicU64,
}

impl ManagerInner {
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.connection.read().clone().ok_or(Error::NotInitialized)
    }

    fn event_sink(self: &Arc<Self>) -> EventSink {
        let weak = Arc::downgrade(self);
        Arc::new(move |event: ConnectionEvent, detail: &str| {
            if let Some(inner) = weak.upgrade() {
                ConnectionManager::borrowed(inner).emit(event, detail);
            }
        })
    }

    /// Publish without validation, for messages checked when their service started.
    fn publish_unchecked(&self, msg: &Message) -> Result<()> {
        let conn = self.connection()?;
        let _op = self.op_lock.lock();
        conn.publish(msg, &Config::new())
    }
}

/// Application entry point for publish/subscribe, request/reply and the
/// standard message services.
///
/// Callbacks receive a `&ConnectionManager` referring to the same manager;
/// it can be used for any call, including `cleanup()`, but dropping it does
/// not tear the manager down.
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
    owner: bool,
}

impl ConnectionManager {
    /// Create a manager builder for `config`.
    pub fn builder(config: Config) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new(config)
    }

    /// Manager with the default transport selected by `mw-id`.
    ///
    /// Only the in-process loopback is built in; other transports are
    /// supplied with [`ConnectionManagerBuilder::factory`].
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    /// Manager on a private loopback bus.
    pub fn loopback(config: Config) -> Self {
        Self::builder(config).loopback(&LoopbackBus::new()).build()
    }

    pub(crate) fn borrowed(inner: Arc<ManagerInner>) -> Self {
        Self {
            inner,
            owner: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Specification used for validation and message population.
    pub fn specification(&self) -> Arc<dyn Specification> {
        Arc::clone(&self.inner.specification)
    }

    /// Crate name and version, plus the transport's version once connected.
    pub fn library_version(&self) -> String {
        let base = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        match self.inner.connection() {
            Ok(conn) => format!("{} [{}]", base, conn.library_version()),
            Err(_) => base,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner
            .connection()
            .map_or(ConnectionState::NotConnected, |conn| conn.state())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.connection.read().is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create and connect the transport.
    ///
    /// On failure the transport is disconnected and released, and the
    /// manager stays uninitialized.
    pub fn initialize(&self) -> Result<()> {
        if self.is_initialized() {
            log::warn!("[manager] initialize() called on an initialized manager");
            return Ok(());
        }

        let conn: Arc<dyn Connection> = Arc::from(self.inner.factory.create(&self.inner.config)?);
        conn.set_event_sink(Some(self.inner.event_sink()));
        conn.set_reply_sink(Some(self.inner.requests.reply_sink()));

        if let Err(e) = conn.connect() {
            conn.set_event_sink(None);
            conn.set_reply_sink(None);
            if let Err(close) = conn.disconnect() {
                log::debug!("[manager] disconnect after failed connect: {}", close);
            }
            return Err(e);
        }

        let mut slot = self.inner.connection.write();
        if slot.is_some() {
            drop(slot);
            log::warn!("[manager] concurrent initialize(); keeping the first connection");
            conn.set_event_sink(None);
            conn.set_reply_sink(None);
            return conn.disconnect();
        }
        *slot = Some(conn);
        log::debug!("[manager] manager {} initialized", self.inner.id);
        Ok(())
    }

    /// Tear down services, auto-dispatch, subscriptions and the transport.
    /// A second call is a no-op.
    pub fn cleanup(&self) -> Result<()> {
        self.inner.heartbeat.lock().take();
        self.inner.resource.lock().take();
        let dispatcher = self.inner.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.stop(true);
        }

        let Some(conn) = self.inner.connection.write().take() else {
            return Ok(());
        };

        self.inner.requests.cancel_all();
        let handles = self.inner.subscriptions.lock().drain();
        for handle in handles {
            if let Err(e) = conn.unsubscribe(handle) {
                log::warn!("[manager] unsubscribe during cleanup failed: {}", e);
            }
        }
        conn.set_event_sink(None);
        conn.set_reply_sink(None);
        log::debug!("[manager] manager {} cleaned up", self.inner.id);
        conn.disconnect()
    }

    // ========================================================================
    // Argument checks and validation
    // ========================================================================

    fn check_subject(&self, subject: &str) -> Result<()> {
        if subject.is_empty() {
            return Err(Error::EmptySubject);
        }
        if self.inner.check_subjects {
            subject::validate_subject(subject, self.inner.lenient_subjects)?;
        }
        Ok(())
    }

    fn check_pattern(&self, pattern: &str) -> Result<()> {
        if pattern.is_empty() {
            return Err(Error::EmptySubject);
        }
        if self.inner.check_subjects {
            subject::validate_pattern(pattern, self.inner.lenient_subjects)?;
        }
        Ok(())
    }

    /// Validate an outgoing message with the identity fields filled in.
    fn validate_outgoing(&self, msg: &Message) -> Result<()> {
        if !self.inner.validate_send {
            return Ok(());
        }
        let mut probe = msg.clone();
        for name in FILL_FIELDS {
            if !probe.has_field(name) {
                probe.add(name, FILL_VALUE)?;
            }
        }
        self.inner.specification.validate_message(&probe)
    }

    /// Validate a message as-is (service prototypes).
    fn validate_exact(&self, msg: &Message) -> Result<()> {
        if self.inner.validate_send {
            self.inner.specification.validate_message(msg)
        } else {
            Ok(())
        }
    }

    fn check_request(&self, msg: &Message) -> Result<()> {
        if msg.kind() != MessageKind::Request {
            return Err(Error::InvalidMessage(
                "Cannot issue request with non-REQUEST kind message.".into(),
            ));
        }
        self.check_subject(msg.subject())
    }

    // ========================================================================
    // Publish / subscribe
    // ========================================================================

    /// Publish a PUBLISH-kind message.
    pub fn publish(&self, msg: &Message) -> Result<()> {
        self.publish_with_config(msg, &Config::new())
    }

    /// Publish with middleware-specific options.
    pub fn publish_with_config(&self, msg: &Message, mw_config: &Config) -> Result<()> {
        let conn = self.inner.connection()?;
        if msg.kind() != MessageKind::Publish {
            return Err(Error::InvalidMessage(
                "Cannot publish message with non-PUBLISH message kind.".into(),
            ));
        }
        self.check_subject(msg.subject())?;

        let _op = self.inner.op_lock.lock();
        self.validate_outgoing(msg)?;
        conn.publish(msg, mw_config)
    }

    pub fn subscribe(&self, pattern: &str) -> Result<SubscriptionInfo> {
        self.subscribe_with(pattern, &Config::new(), None)
    }

    pub fn subscribe_with_config(&self, pattern: &str, config: &Config) -> Result<SubscriptionInfo> {
        self.subscribe_with(pattern, config, None)
    }

    /// Subscribe and deliver matching messages to `callback` during dispatch.
    pub fn subscribe_with_callback<C>(&self, pattern: &str, callback: C) -> Result<SubscriptionInfo>
    where
        C: MessageCallback + 'static,
    {
        self.subscribe_with(pattern, &Config::new(), Some(Arc::new(callback)))
    }

    /// General form of the subscribe calls.
    pub fn subscribe_with(
        &self,
        pattern: &str,
        config: &Config,
        callback: Option<Arc<dyn MessageCallback>>,
    ) -> Result<SubscriptionInfo> {
        let conn = self.inner.connection()?;
        self.check_pattern(pattern)?;

        let mut subscriptions = self.inner.subscriptions.lock();
        let handle = conn.subscribe(pattern, config)?;
        let info = subscriptions.insert(pattern, config, handle, callback);
        log::debug!("[manager] subscribed to {}", pattern);
        Ok(info)
    }

    /// Release a subscription and set `info` to `None`.
    pub fn unsubscribe(&self, info: &mut Option<SubscriptionInfo>) -> Result<()> {
        let Some(current) = info.as_ref() else {
            return Err(Error::UninitializedObject(
                "The SubscriptionInfo object is null.".into(),
            ));
        };
        let conn = self.inner.connection()?;

        let mut subscriptions = self.inner.subscriptions.lock();
        let handle = subscriptions.handle_of(current).ok_or_else(|| {
            Error::InvalidSubscription(
                "The given SubscriptionInfo object is not associated with this ConnectionManager"
                    .into(),
            )
        })?;
        conn.unsubscribe(handle)?;
        subscriptions.remove(current);
        drop(subscriptions);

        log::debug!("[manager] unsubscribed from {}", current.subject());
        *info = None;
        Ok(())
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Stop delivery of messages whose subject matches `pattern`.
    pub fn exclude_subject(&self, pattern: &str) -> Result<()> {
        let conn = self.inner.connection()?;
        self.check_pattern(pattern)?;
        conn.exclude_subject(pattern)
    }

    pub fn remove_excluded_subject(&self, pattern: &str) -> Result<()> {
        let conn = self.inner.connection()?;
        self.check_pattern(pattern)?;
        conn.remove_excluded_subject(pattern)
    }

    // ========================================================================
    // Receive / dispatch
    // ========================================================================

    /// Next delivered message. `timeout_ms < 0` waits indefinitely;
    /// `Ok(None)` means the timeout elapsed.
    pub fn receive(&self, timeout_ms: i32) -> Result<Option<Message>> {
        let conn = self.inner.connection()?;
        let received = conn.receive(timeout_ms)?;
        if let Some(msg) = &received {
            if self.inner.validate_recv {
                self.inner.specification.validate_message(msg)?;
            }
        }
        Ok(received)
    }

    /// Run the callbacks of every subscription matching `msg`.
    pub fn dispatch(&self, msg: &Message) -> Result<()> {
        self.inner.connection()?;
        self.dispatch_delivered(msg);
        Ok(())
    }

    pub(crate) fn dispatch_delivered(&self, msg: &Message) {
        let callbacks = self.inner.subscriptions.lock().callbacks_for(msg.subject());
        for callback in callbacks {
            guarded("message", || callback.on_message(self, msg));
        }
    }

    /// Start the auto-dispatch thread. `Ok(false)` if it is already running.
    pub fn start_auto_dispatch(&self) -> Result<bool> {
        self.inner.connection()?;
        let mut slot = self.inner.dispatcher.lock();
        if slot.as_ref().is_some_and(|d| !d.is_finished()) {
            return Ok(false);
        }
        *slot = Some(AutoDispatcher::start(Arc::downgrade(&self.inner))?);
        Ok(true)
    }

    /// Stop the auto-dispatch thread, joining it if `wait`. `Ok(false)` if
    /// it was not running.
    pub fn stop_auto_dispatch(&self, wait: bool) -> Result<bool> {
        self.inner.connection()?;
        let dispatcher = self.inner.dispatcher.lock().take();
        match dispatcher {
            Some(dispatcher) => {
                dispatcher.stop(wait);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Request / reply
    // ========================================================================

    /// Republish interval a request would use for `republish_ms`
    /// (`None` = publish once).
    pub fn republish_interval(&self, republish_ms: i32) -> Option<Duration> {
        resolve_republish(republish_ms, self.inner.default_republish_ms)
    }

    fn send_request(&self, conn: &dyn Connection, msg: &Message, id: &str) -> Result<()> {
        let _op = self.inner.op_lock.lock();
        self.validate_outgoing(msg)?;
        conn.request(msg, id)
    }

    /// Send `msg` and block for its reply.
    ///
    /// `timeout_ms < 0` waits indefinitely. `republish_ms`: negative never
    /// republishes, zero uses the manager default, positive values are
    /// raised to the 100 ms floor. Returns `Ok(None)` on timeout.
    pub fn request(
        &self,
        msg: &Message,
        timeout_ms: i32,
        republish_ms: i32,
    ) -> Result<Option<Message>> {
        let conn = self.inner.connection()?;
        self.check_request(msg)?;
        let republish = self.republish_interval(republish_ms);

        let requests = &self.inner.requests;
        let (id, rx) = requests.register();
        if let Err(e) = self.send_request(conn.as_ref(), msg, &id) {
            requests.forget(&id);
            return Err(e);
        }

        match requests.wait(conn.as_ref(), msg, &id, &rx, timeout_ms, republish)? {
            Outcome::Reply(reply) => Ok(Some(reply)),
            Outcome::TimedOut => {
                log::debug!("[manager] request on {} timed out", msg.subject());
                Ok(None)
            }
            Outcome::Abandoned => Ok(None),
        }
    }

    /// Send `msg` and return at once; `callback` receives the reply, or a
    /// REQUEST_TIMEOUT event, on a `gmsec-request` thread.
    pub fn request_with_callback(
        &self,
        msg: &Message,
        timeout_ms: i32,
        callback: Arc<dyn ReplyCallback>,
        republish_ms: i32,
    ) -> Result<()> {
        let conn = self.inner.connection()?;
        self.check_request(msg)?;
        let republish = self.republish_interval(republish_ms);

        let requests = Arc::clone(&self.inner.requests);
        let (id, rx) = requests.register();
        let cancelled = requests.track(&id, Arc::clone(&callback));
        if let Err(e) = self.send_request(conn.as_ref(), msg, &id) {
            requests.untrack(&id);
            requests.forget(&id);
            return Err(e);
        }

        let manager = Arc::downgrade(&self.inner);
        let table = Arc::clone(&requests);
        let request = msg.clone();
        let request_id = id.clone();
        let spawned = thread::Builder::new()
            .name("gmsec-request".into())
            .spawn(move || {
                let outcome =
                    table.wait(conn.as_ref(), &request, &request_id, &rx, timeout_ms, republish);
                table.untrack(&request_id);
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let Some(inner) = manager.upgrade() else {
                    return;
                };
                let mgr = ConnectionManager::borrowed(inner);
                match outcome {
                    Ok(Outcome::Reply(reply)) => {
                        guarded("reply", || callback.on_reply(&mgr, &request, &reply));
                    }
                    Ok(Outcome::TimedOut) => {
                        let detail = format!("Request on {} timed out", request.subject());
                        guarded("reply", || {
                            callback.on_event(&mgr, ConnectionEvent::RequestTimeout, &detail);
                        });
                        mgr.emit(ConnectionEvent::RequestTimeout, &detail);
                    }
                    Ok(Outcome::Abandoned) => {}
                    Err(e) => log::warn!("[manager] request {} failed: {}", request_id, e),
                }
            });

        if let Err(e) = spawned {
            requests.untrack(&id);
            requests.forget(&id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Stop `callback` from receiving replies to its pending requests.
    ///
    /// A callback invocation already in progress is not interrupted.
    pub fn cancel_request(&self, callback: &Arc<dyn ReplyCallback>) -> Result<()> {
        if self.inner.requests.cancel(callback) {
            Ok(())
        } else {
            Err(Error::InvalidCallback(
                "The reply callback is not registered with any pending request.".into(),
            ))
        }
    }

    /// Send `reply` to the issuer of `request`.
    pub fn reply(&self, request: &Message, reply: &Message) -> Result<()> {
        let conn = self.inner.connection()?;
        if request.kind() != MessageKind::Request {
            return Err(Error::InvalidMessage(
                "Cannot issue reply with non-REQUEST kind message.".into(),
            ));
        }
        if reply.kind() != MessageKind::Reply {
            return Err(Error::InvalidMessage(
                "Cannot issue reply with non-REPLY kind message.".into(),
            ));
        }
        self.check_subject(reply.subject())?;

        let _op = self.inner.op_lock.lock();
        self.validate_outgoing(reply)?;
        conn.reply(request, reply)
    }

    // ========================================================================
    // Standard fields
    // ========================================================================

    /// Replace the global standard fields. Unset or unnamed entries are
    /// skipped with a warning.
    pub fn set_standard_fields(&self, fields: &[Field]) {
        self.inner.populator.lock().set_standard_fields(fields);
    }

    pub fn standard_fields(&self) -> Vec<Field> {
        self.inner.populator.lock().standard_fields().to_vec()
    }

    /// Add every global standard field to `msg`, replacing same-named fields.
    pub fn add_standard_fields(&self, msg: &mut Message) -> Result<()> {
        self.inner.populator.lock().add_standard_fields(msg)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register `callback` for `event` ([`ConnectionEvent::AllEvents`] for
    /// every event). Registrations survive `cleanup()`.
    pub fn register_event_callback<C>(&self, event: ConnectionEvent, callback: C)
    where
        C: EventCallback + 'static,
    {
        self.inner.events.lock().register(event, Arc::new(callback));
    }

    pub(crate) fn emit(&self, event: ConnectionEvent, detail: &str) {
        log::debug!("[manager] {}: {}", event, detail);
        let callbacks = self.inner.events.lock().interested(event);
        for callback in callbacks {
            guarded("event", || callback.on_event(self, event, detail));
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.owner {
            if let Err(e) = self.cleanup() {
                log::warn!("[manager] cleanup on drop failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("id", &self.inner.id)
            .field("initialized", &self.is_initialized())
            .field("validate_send", &self.inner.validate_send)
            .field("validate_recv", &self.inner.validate_recv)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MSG_CONTENT_VALIDATE, REQ_REPUBLISH_MS};
    use std::sync::atomic::AtomicUsize;

    fn connected() -> ConnectionManager {
        let mgr = ConnectionManager::loopback(Config::new());
        mgr.initialize().unwrap();
        mgr
    }

    #[test]
    fn test_operations_require_initialize() {
        let mgr = ConnectionManager::loopback(Config::new());
        let msg = Message::new("GMSEC.A", MessageKind::Publish);
        assert!(matches!(mgr.publish(&msg), Err(Error::NotInitialized)));
        assert!(matches!(mgr.subscribe("GMSEC.>"), Err(Error::NotInitialized)));
        assert!(matches!(mgr.receive(0), Err(Error::NotInitialized)));
        assert!(matches!(mgr.start_auto_dispatch(), Err(Error::NotInitialized)));
        assert_eq!(mgr.state(), ConnectionState::NotConnected);
    }

    #[test]
    fn test_publish_rejects_wrong_kind_and_empty_subject() {
        let mgr = connected();
        let req = Message::new("GMSEC.A", MessageKind::Request);
        assert!(matches!(mgr.publish(&req), Err(Error::InvalidMessage(_))));

        let msg = Message::new("GMSEC.A", MessageKind::Publish);
        let empty = Message::new("", MessageKind::Publish);
        assert!(matches!(mgr.publish(&empty), Err(Error::EmptySubject)));
        assert!(matches!(mgr.subscribe(""), Err(Error::EmptySubject)));
        assert!(mgr.publish(&msg).is_ok());
    }

    #[test]
    fn test_validation_fills_identity_fields() {
        let mgr = ConnectionManager::builder(Config::new().with(MSG_CONTENT_VALIDATE, "true"))
            .loopback(&LoopbackBus::new())
            .build();
        mgr.initialize().unwrap();

        let mut hb = mgr.create_heartbeat_message("GMSEC.M.HB", &[]).unwrap();
        assert!(mgr.publish(&hb).is_ok());
        assert!(!hb.has_field("COMPONENT"));

        hb.remove_field("PUB-RATE");
        let err = mgr.publish(&hb).unwrap_err();
        assert!(err.validation_report().unwrap().mentions("PUB-RATE"));
    }

    #[test]
    fn test_default_republish_from_config() {
        let mgr = ConnectionManager::loopback(Config::new().with(REQ_REPUBLISH_MS, "250"));
        assert_eq!(mgr.republish_interval(0), Some(Duration::from_millis(250)));
        assert_eq!(mgr.republish_interval(-1), None);
        assert_eq!(mgr.republish_interval(50), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_event_callback_sees_connect() {
        let mgr = ConnectionManager::loopback(Config::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        mgr.register_event_callback(
            ConnectionEvent::ConnectionSuccessful,
            move |_: &ConnectionManager, _: ConnectionEvent, _: &str| {
                counter.fetch_add(1, Ordering::AcqRel);
            },
        );
        mgr.initialize().unwrap();
        assert_eq!(seen.load(Ordering::Acquire), 1);
        assert_eq!(mgr.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_cleanup_twice_and_reinitialize() {
        let mgr = connected();
        let _sub = mgr.subscribe("GMSEC.>").unwrap();
        assert_eq!(mgr.subscription_count(), 1);
        mgr.cleanup().unwrap();
        mgr.cleanup().unwrap();
        assert_eq!(mgr.subscription_count(), 0);
        assert!(!mgr.is_initialized());

        mgr.initialize().unwrap();
        assert!(mgr.is_initialized());
    }

    #[test]
    fn test_library_version() {
        let mgr = ConnectionManager::loopback(Config::new());
        assert!(mgr.library_version().starts_with("gmsec "));
        mgr.initialize().unwrap();
        assert!(mgr.library_version().contains('['));
    }
}
