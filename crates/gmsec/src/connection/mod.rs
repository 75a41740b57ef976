// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport contract consumed by the connection manager.
//!
//! A [`Connection`] moves whole [`Message`]s between processes. It knows
//! nothing about standard fields, validation or callbacks; those live in
//! [`crate::ConnectionManager`].
//!
//! ```text
//!  ConnectionManager ──publish/request/reply──> Connection ──> middleware
//!         ^                                         │
//!         └──── receive(timeout) / reply sink <─────┘
//! ```
//!
//! Replies to outstanding requests never come back through `receive`: the
//! transport hands them to the [`ReplySink`] installed by the manager, which
//! matches them against its pending-request table by request id.

mod loopback;

pub use loopback::{LoopbackBus, LoopbackConnection};

use crate::config::Config;
use crate::error::Result;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;

/// Header field carrying the request id that ties a reply to its request.
pub const REQUEST_ID_FIELD: &str = "UNIQUE-ID";

/// Transport connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    NotConnected,
    Connected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::NotConnected => "NOT_CONNECTED",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Reconnecting => "RECONNECTING",
        };
        f.write_str(name)
    }
}

/// Lifecycle and delivery events reported to event callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    ConnectionSuccessful,
    ConnectionBroken,
    ConnectionReconnect,
    DispatchFailed,
    RequestTimeout,
    InvalidMessage,
    /// Registration-only: receives every other event.
    AllEvents,
}

impl ConnectionEvent {
    pub fn name(self) -> &'static str {
        match self {
            ConnectionEvent::ConnectionSuccessful => "CONNECTION_SUCCESSFUL_EVENT",
            ConnectionEvent::ConnectionBroken => "CONNECTION_BROKEN_EVENT",
            ConnectionEvent::ConnectionReconnect => "CONNECTION_RECONNECT_EVENT",
            ConnectionEvent::DispatchFailed => "DISPATCH_FAILURE_EVENT",
            ConnectionEvent::RequestTimeout => "REQUEST_TIMEOUT_EVENT",
            ConnectionEvent::InvalidMessage => "INVALID_MESSAGE_EVENT",
            ConnectionEvent::AllEvents => "ALL_EVENTS",
        }
    }

    /// Would a callback registered for `self` receive `event`?
    pub fn accepts(self, event: ConnectionEvent) -> bool {
        self == ConnectionEvent::AllEvents || self == event
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque transport-side subscription id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    connection: u64,
    id: u64,
}

impl SubscriptionHandle {
    pub fn new(connection: u64, id: u64) -> Self {
        Self { connection, id }
    }

    /// Id of the connection that issued the handle.
    pub fn connection(&self) -> u64 {
        self.connection
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Receives lifecycle events raised by the transport.
pub type EventSink = Arc<dyn Fn(ConnectionEvent, &str) + Send + Sync>;

/// Receives replies addressed to requests issued through this connection.
pub type ReplySink = Arc<dyn Fn(Message) + Send + Sync>;

/// Middleware connection.
///
/// Implementations are shared between the caller, the auto-dispatch thread
/// and the service threads, so every method takes `&self`.
pub trait Connection: Send + Sync {
    /// Establish the middleware session.
    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    fn state(&self) -> ConnectionState;

    /// Middleware name and version.
    fn library_version(&self) -> String;

    fn set_event_sink(&self, sink: Option<EventSink>);

    fn set_reply_sink(&self, sink: Option<ReplySink>);

    fn subscribe(&self, pattern: &str, config: &Config) -> Result<SubscriptionHandle>;

    fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<()>;

    /// Send a PUBLISH message. `config` carries middleware-specific options.
    fn publish(&self, msg: &Message, config: &Config) -> Result<()>;

    /// Send a REQUEST stamped with `request_id`. Replies arrive through the
    /// reply sink carrying the same id.
    fn request(&self, msg: &Message, request_id: &str) -> Result<()>;

    /// Route `reply` back to whoever issued `request`.
    fn reply(&self, request: &Message, reply: &Message) -> Result<()>;

    /// Next delivered message. `timeout_ms < 0` waits until one arrives or
    /// the connection goes down; `Ok(None)` means the timeout elapsed.
    fn receive(&self, timeout_ms: i32) -> Result<Option<Message>>;

    /// Drop future deliveries whose subject matches `pattern`.
    fn exclude_subject(&self, pattern: &str) -> Result<()>;

    fn remove_excluded_subject(&self, pattern: &str) -> Result<()>;
}

/// Creates connections for a configuration.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self, config: &Config) -> Result<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&Config) -> Result<Box<dyn Connection>> + Send + Sync,
{
    fn create(&self, config: &Config) -> Result<Box<dyn Connection>> {
        self(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_accepts_everything() {
        assert!(ConnectionEvent::AllEvents.accepts(ConnectionEvent::RequestTimeout));
        assert!(ConnectionEvent::DispatchFailed.accepts(ConnectionEvent::DispatchFailed));
        assert!(!ConnectionEvent::DispatchFailed.accepts(ConnectionEvent::ConnectionBroken));
    }

    #[test]
    fn test_names() {
        assert_eq!(ConnectionState::Connected.to_string(), "CONNECTED");
        assert_eq!(
            ConnectionEvent::ConnectionSuccessful.to_string(),
            "CONNECTION_SUCCESSFUL_EVENT"
        );
    }
}
