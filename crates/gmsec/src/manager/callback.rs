// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback traits and the per-manager event registry.
//!
//! Every callback receives the owning [`ConnectionManager`], so it may call
//! back into the manager (publish a reply, update a heartbeat field, ...).
//! Closures implement the traits directly.

use super::ConnectionManager;
use crate::connection::ConnectionEvent;
use crate::message::Message;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Invoked for each delivered message matching a subscription.
pub trait MessageCallback: Send + Sync {
    fn on_message(&self, mgr: &ConnectionManager, msg: &Message);
}

impl<F> MessageCallback for F
where
    F: Fn(&ConnectionManager, &Message) + Send + Sync,
{
    fn on_message(&self, mgr: &ConnectionManager, msg: &Message) {
        self(mgr, msg)
    }
}

/// Invoked on connection lifecycle and delivery events.
pub trait EventCallback: Send + Sync {
    fn on_event(&self, mgr: &ConnectionManager, event: ConnectionEvent, detail: &str);
}

impl<F> EventCallback for F
where
    F: Fn(&ConnectionManager, ConnectionEvent, &str) + Send + Sync,
{
    fn on_event(&self, mgr: &ConnectionManager, event: ConnectionEvent, detail: &str) {
        self(mgr, event, detail)
    }
}

/// Invoked with the reply to an asynchronous request, or with
/// [`ConnectionEvent::RequestTimeout`] when none arrived in time.
pub trait ReplyCallback: Send + Sync {
    fn on_reply(&self, mgr: &ConnectionManager, request: &Message, reply: &Message);

    fn on_event(&self, _mgr: &ConnectionManager, _event: ConnectionEvent, _detail: &str) {}
}

impl<F> ReplyCallback for F
where
    F: Fn(&ConnectionManager, &Message, &Message) + Send + Sync,
{
    fn on_reply(&self, mgr: &ConnectionManager, request: &Message, reply: &Message) {
        self(mgr, request, reply)
    }
}

/// Run a user callback, containing any panic. Returns `false` if it panicked.
pub(crate) fn guarded<F: FnOnce()>(what: &str, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(_) => {
            log::error!("[dispatch] {} callback panicked", what);
            false
        }
    }
}

/// Event callbacks in registration order.
#[derive(Default)]
pub(crate) struct EventRegistry {
    entries: Vec<(ConnectionEvent, Arc<dyn EventCallback>)>,
}

impl EventRegistry {
    pub fn register(&mut self, event: ConnectionEvent, callback: Arc<dyn EventCallback>) {
        self.entries.push((event, callback));
    }

    /// Callbacks that should see `event`.
    pub fn interested(&self, event: ConnectionEvent) -> Vec<Arc<dyn EventCallback>> {
        self.entries
            .iter()
            .filter(|(registered, _)| registered.accepts(event))
            .map(|(_, cb)| Arc::clone(cb))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
