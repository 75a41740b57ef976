// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport.
//!
//! Every [`LoopbackConnection`] created from the same [`LoopbackBus`] sees the
//! messages the others publish. Messages travel as header-encoded bytes
//! (subject and kind included), so each delivery is an independent copy
//! produced by the binary codec.
//!
//! ```text
//!  conn A publish ──encode──> bus ──match subscriptions──> conn B inbox
//!                                  (minus excluded subjects)   │
//!                                                    receive ──decode──> Message
//! ```

use super::{
    Connection, ConnectionEvent, ConnectionFactory, ConnectionState, EventSink, ReplySink,
    SubscriptionHandle, REQUEST_ID_FIELD,
};
use crate::codec::{Decoder, Encoder};
use crate::config::{Config, DISPATCH_POLL_MS};
use crate::error::{Error, Result};
use crate::field::Field;
use crate::message::Message;
use crate::subject;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared in-process message bus.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_connection: AtomicU64,
    endpoints: RwLock<HashMap<u64, Arc<Endpoint>>>,
    /// Outstanding request id -> issuing connection.
    requests: DashMap<String, u64>,
}

struct Endpoint {
    id: u64,
    subscriptions: Mutex<Vec<(u64, String)>>,
    excluded: Mutex<Vec<String>>,
    inbox: Sender<Vec<u8>>,
    reply_sink: Mutex<Option<ReplySink>>,
}

impl Endpoint {
    fn wants(&self, subject: &str) -> bool {
        let subscribed = self
            .subscriptions
            .lock()
            .iter()
            .any(|(_, pattern)| subject::matches(pattern, subject));
        subscribed
            && !self
                .excluded
                .lock()
                .iter()
                .any(|pattern| subject::matches(pattern, subject))
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unconnected connection attached to this bus.
    pub fn connection(&self) -> LoopbackConnection {
        let id = self.inner.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = channel::unbounded();
        LoopbackConnection {
            bus: Arc::clone(&self.inner),
            endpoint: Arc::new(Endpoint {
                id,
                subscriptions: Mutex::new(Vec::new()),
                excluded: Mutex::new(Vec::new()),
                inbox: tx,
                reply_sink: Mutex::new(None),
            }),
            inbox: rx,
            state: Mutex::new(ConnectionState::NotConnected),
            event_sink: Mutex::new(None),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Factory handing out connections on this bus.
    pub fn factory(&self) -> Arc<dyn ConnectionFactory> {
        let bus = self.clone();
        Arc::new(move |_config: &Config| -> Result<Box<dyn Connection>> {
            Ok(Box::new(bus.connection()))
        })
    }

    /// Number of currently connected endpoints.
    pub fn connected_count(&self) -> usize {
        self.inner.endpoints.read().len()
    }
}

impl BusInner {
    fn deliver(&self, subject: &str, bytes: &[u8]) -> usize {
        let targets: Vec<Arc<Endpoint>> = self
            .endpoints
            .read()
            .values()
            .filter(|ep| ep.wants(subject))
            .cloned()
            .collect();
        for ep in &targets {
            if ep.inbox.send(bytes.to_vec()).is_err() {
                log::debug!("[loopback] inbox of connection {} is closed", ep.id);
            }
        }
        targets.len()
    }

    fn route_reply(&self, request_id: &str, reply: Message) {
        let Some((_, origin)) = self.requests.remove(request_id) else {
            log::debug!("[loopback] no requester waiting on {}", request_id);
            return;
        };
        let sink = self
            .endpoints
            .read()
            .get(&origin)
            .and_then(|ep| ep.reply_sink.lock().clone());
        match sink {
            Some(sink) => sink(reply),
            None => log::debug!("[loopback] requester {} has no reply sink", origin),
        }
    }
}

/// One endpoint on a [`LoopbackBus`].
pub struct LoopbackConnection {
    bus: Arc<BusInner>,
    endpoint: Arc<Endpoint>,
    inbox: Receiver<Vec<u8>>,
    state: Mutex<ConnectionState>,
    event_sink: Mutex<Option<EventSink>>,
    next_subscription: AtomicU64,
}

impl LoopbackConnection {
    pub fn id(&self) -> u64 {
        self.endpoint.id
    }

    fn ensure_connected(&self) -> Result<()> {
        if *self.state.lock() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(Error::Connection(format!(
                "loopback connection {} is not connected",
                self.endpoint.id
            )))
        }
    }

    fn emit(&self, event: ConnectionEvent, detail: &str) {
        let sink = self.event_sink.lock().clone();
        if let Some(sink) = sink {
            sink(event, detail);
        }
    }

    fn encode(msg: &Message) -> Result<Vec<u8>> {
        Ok(Encoder::new().with_header(true).encode(msg)?)
    }

    fn decode(bytes: &[u8]) -> Result<Message> {
        Ok(Decoder::new().with_header(true).decode(bytes)?)
    }

    fn stamped(msg: &Message, request_id: &str) -> Result<Message> {
        let mut copy = msg.clone();
        copy.add_field(Field::header(REQUEST_ID_FIELD, request_id))?;
        Ok(copy)
    }
}

impl Connection for LoopbackConnection {
    fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Connected {
                return Ok(());
            }
            self.bus
                .endpoints
                .write()
                .insert(self.endpoint.id, Arc::clone(&self.endpoint));
            *state = ConnectionState::Connected;
        }
        log::debug!("[loopback] connection {} connected", self.endpoint.id);
        self.emit(
            ConnectionEvent::ConnectionSuccessful,
            "Connection established to loopback bus",
        );
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == ConnectionState::NotConnected {
            return Ok(());
        }
        self.bus.endpoints.write().remove(&self.endpoint.id);
        self.bus.requests.retain(|_, origin| *origin != self.endpoint.id);
        *state = ConnectionState::NotConnected;
        log::debug!("[loopback] connection {} disconnected", self.endpoint.id);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn library_version(&self) -> String {
        format!("gmsec-loopback {}", env!("CARGO_PKG_VERSION"))
    }

    fn set_event_sink(&self, sink: Option<EventSink>) {
        *self.event_sink.lock() = sink;
    }

    fn set_reply_sink(&self, sink: Option<ReplySink>) {
        *self.endpoint.reply_sink.lock() = sink;
    }

    fn subscribe(&self, pattern: &str, _config: &Config) -> Result<SubscriptionHandle> {
        self.ensure_connected()?;
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1;
        self.endpoint
            .subscriptions
            .lock()
            .push((id, pattern.to_string()));
        log::trace!("[loopback] {} subscribed to {}", self.endpoint.id, pattern);
        Ok(SubscriptionHandle::new(self.endpoint.id, id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()> {
        if handle.connection() != self.endpoint.id {
            return Err(Error::InvalidSubscription(format!(
                "subscription {} belongs to connection {}",
                handle.id(),
                handle.connection()
            )));
        }
        let mut subs = self.endpoint.subscriptions.lock();
        let before = subs.len();
        subs.retain(|(id, _)| *id != handle.id());
        if subs.len() == before {
            return Err(Error::InvalidSubscription(format!(
                "unknown subscription {}",
                handle.id()
            )));
        }
        Ok(())
    }

    fn publish(&self, msg: &Message, _config: &Config) -> Result<()> {
        self.ensure_connected()?;
        let bytes = Self::encode(msg)?;
        let delivered = self.bus.deliver(msg.subject(), &bytes);
        log::trace!(
            "[loopback] published {} ({} bytes) to {} endpoint(s)",
            msg.subject(),
            bytes.len(),
            delivered
        );
        Ok(())
    }

    fn request(&self, msg: &Message, request_id: &str) -> Result<()> {
        self.ensure_connected()?;
        let bytes = Self::encode(&Self::stamped(msg, request_id)?)?;
        self.bus
            .requests
            .insert(request_id.to_string(), self.endpoint.id);
        self.bus.deliver(msg.subject(), &bytes);
        Ok(())
    }

    fn reply(&self, request: &Message, reply: &Message) -> Result<()> {
        self.ensure_connected()?;
        let request_id = request
            .get_field(REQUEST_ID_FIELD)
            .and_then(Field::as_str)
            .ok_or_else(|| {
                Error::InvalidMessage(format!(
                    "request on {} carries no {} field",
                    request.subject(),
                    REQUEST_ID_FIELD
                ))
            })?;
        let bytes = Self::encode(&Self::stamped(reply, request_id)?)?;
        self.bus.route_reply(request_id, Self::decode(&bytes)?);
        Ok(())
    }

    fn receive(&self, timeout_ms: i32) -> Result<Option<Message>> {
        self.ensure_connected()?;
        let bytes = if timeout_ms < 0 {
            loop {
                match self
                    .inbox
                    .recv_timeout(Duration::from_millis(DISPATCH_POLL_MS))
                {
                    Ok(bytes) => break bytes,
                    Err(RecvTimeoutError::Timeout) => self.ensure_connected()?,
                    Err(RecvTimeoutError::Disconnected) => return Ok(None),
                }
            }
        } else {
            match self
                .inbox
                .recv_timeout(Duration::from_millis(timeout_ms as u64))
            {
                Ok(bytes) => bytes,
                Err(_) => return Ok(None),
            }
        };
        Self::decode(&bytes).map(Some)
    }

    fn exclude_subject(&self, pattern: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut excluded = self.endpoint.excluded.lock();
        if !excluded.iter().any(|p| p == pattern) {
            excluded.push(pattern.to_string());
        }
        Ok(())
    }

    fn remove_excluded_subject(&self, pattern: &str) -> Result<()> {
        self.ensure_connected()?;
        self.endpoint.excluded.lock().retain(|p| p != pattern);
        Ok(())
    }
}

impl Drop for LoopbackConnection {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            log::debug!("[loopback] disconnect on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn connected(bus: &LoopbackBus) -> LoopbackConnection {
        let conn = bus.connection();
        conn.connect().unwrap();
        conn
    }

    #[test]
    fn test_publish_reaches_matching_subscriber() {
        let bus = LoopbackBus::new();
        let a = connected(&bus);
        let b = connected(&bus);
        b.subscribe("GMSEC.*.HB", &Config::new()).unwrap();

        let mut msg = Message::new("GMSEC.SAT1.HB", MessageKind::Publish);
        msg.add("COUNTER", 7i16).unwrap();
        a.publish(&msg, &Config::new()).unwrap();
        a.publish(&Message::new("GMSEC.SAT1.LOG", MessageKind::Publish), &Config::new())
            .unwrap();

        let got = b.receive(500).unwrap().unwrap();
        assert_eq!(got, msg);
        assert!(b.receive(20).unwrap().is_none());
        assert!(a.receive(20).unwrap().is_none());
    }

    #[test]
    fn test_excluded_subject_is_dropped() {
        let bus = LoopbackBus::new();
        let conn = connected(&bus);
        conn.subscribe("GMSEC.>", &Config::new()).unwrap();
        conn.exclude_subject("GMSEC.*.LOG").unwrap();

        conn.publish(&Message::new("GMSEC.A.LOG", MessageKind::Publish), &Config::new())
            .unwrap();
        assert!(conn.receive(20).unwrap().is_none());

        conn.remove_excluded_subject("GMSEC.*.LOG").unwrap();
        conn.publish(&Message::new("GMSEC.A.LOG", MessageKind::Publish), &Config::new())
            .unwrap();
        assert!(conn.receive(500).unwrap().is_some());
    }

    #[test]
    fn test_reply_routed_to_requester() {
        let bus = LoopbackBus::new();
        let requester = connected(&bus);
        let replier = connected(&bus);
        replier.subscribe("GMSEC.REQ.>", &Config::new()).unwrap();

        let (tx, rx) = channel::unbounded();
        requester.set_reply_sink(Some(Arc::new(move |m: Message| {
            let _ = tx.send(m);
        })));

        let request = Message::new("GMSEC.REQ.DIR", MessageKind::Request);
        requester.request(&request, "id-1").unwrap();

        let received = replier.receive(500).unwrap().unwrap();
        assert_eq!(received.get_string_value(REQUEST_ID_FIELD).unwrap(), "id-1");
        let reply = Message::new("GMSEC.RESP.DIR", MessageKind::Reply);
        replier.reply(&received, &reply).unwrap();

        let got = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(got.kind(), MessageKind::Reply);
        assert_eq!(got.get_string_value(REQUEST_ID_FIELD).unwrap(), "id-1");
    }

    #[test]
    fn test_requires_connection() {
        let bus = LoopbackBus::new();
        let conn = bus.connection();
        let msg = Message::new("GMSEC.X", MessageKind::Publish);
        assert!(matches!(
            conn.publish(&msg, &Config::new()),
            Err(Error::Connection(_))
        ));
        conn.connect().unwrap();
        assert_eq!(bus.connected_count(), 1);
        conn.disconnect().unwrap();
        assert_eq!(bus.connected_count(), 0);
        assert_eq!(conn.state(), ConnectionState::NotConnected);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let bus = LoopbackBus::new();
        let a = connected(&bus);
        let b = connected(&bus);
        let handle = a.subscribe("GMSEC.X", &Config::new()).unwrap();
        assert!(b.unsubscribe(handle).is_err());
        a.unsubscribe(handle).unwrap();
        assert!(a.unsubscribe(handle).is_err());
    }
}
