// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outstanding requests and reply correlation.
//!
//! ```text
//! request(msg) ─> pending.insert(id, tx) ─> Connection::request(msg, id)
//!                                                   │
//! reply sink  <── Connection (reply carrying id) <──┘
//!     └─> pending.remove(id) ─> tx.send(reply) ─> waiter wakes
//! ```
//!
//! While waiting, the request is republished every republish interval until
//! the reply arrives or the timeout expires.

use super::callback::ReplyCallback;
use crate::config::MIN_REPUBLISH_MS;
use crate::connection::{Connection, ReplySink, REQUEST_ID_FIELD};
use crate::error::Result;
use crate::field::Field;
use crate::message::Message;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Effective republish interval for a requested value.
///
/// Negative: never. Zero: `default_ms` (itself negative for never). Positive
/// values below [`MIN_REPUBLISH_MS`] are raised to it.
pub(crate) fn resolve_republish(requested_ms: i32, default_ms: i32) -> Option<Duration> {
    let ms = match requested_ms {
        r if r < 0 => return None,
        0 if default_ms < 0 => return None,
        0 => default_ms,
        r => r,
    };
    Some(Duration::from_millis(ms.max(MIN_REPUBLISH_MS) as u64))
}

/// How a wait for a reply ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    Reply(Message),
    TimedOut,
    /// Cancelled, or the table was cleared by cleanup.
    Abandoned,
}

struct AsyncEntry {
    id: String,
    callback: Arc<dyn ReplyCallback>,
    cancelled: Arc<AtomicBool>,
}

/// Pending-request table of one manager.
#[derive(Default)]
pub(crate) struct RequestTable {
    pending: DashMap<String, Sender<Message>>,
    callbacks: Mutex<Vec<AsyncEntry>>,
}

impl RequestTable {
    /// Sink to install on the connection.
    pub fn reply_sink(self: &Arc<Self>) -> ReplySink {
        let table: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |reply: Message| {
            if let Some(table) = table.upgrade() {
                table.route(reply);
            }
        })
    }

    fn route(&self, reply: Message) {
        let Some(id) = reply.get_field(REQUEST_ID_FIELD).and_then(Field::as_str) else {
            log::debug!("[request] reply on {} has no request id", reply.subject());
            return;
        };
        match self.pending.remove(id) {
            Some((_, tx)) => drop(tx.send(reply)),
            None => log::debug!("[request] late or unknown reply for {}", id),
        }
    }

    /// Open a slot for a new request.
    pub fn register(&self) -> (String, Receiver<Message>) {
        let id = super::populator::unique_id();
        let (tx, rx) = channel::bounded(1);
        self.pending.insert(id.clone(), tx);
        (id, rx)
    }

    pub fn forget(&self, id: &str) {
        self.pending.remove(id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Wait for the reply to request `id`, republishing `msg` on schedule.
    ///
    /// `timeout_ms < 0` waits forever. The slot is always released on return.
    pub fn wait(
        &self,
        conn: &dyn Connection,
        msg: &Message,
        id: &str,
        rx: &Receiver<Message>,
        timeout_ms: i32,
        republish: Option<Duration>,
    ) -> Result<Outcome> {
        let deadline = (timeout_ms >= 0)
            .then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));
        let mut last_send = Instant::now();

        let outcome = loop {
            let next_send = republish.map(|every| last_send + every);
            let wake = match (deadline, next_send) {
                (Some(d), Some(n)) => Some(d.min(n)),
                (d, n) => d.or(n),
            };

            let received = match wake {
                Some(at) => rx.recv_deadline(at),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(reply) => break Outcome::Reply(reply),
                Err(RecvTimeoutError::Disconnected) => break Outcome::Abandoned,
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    if deadline.is_some_and(|d| now >= d) {
                        break Outcome::TimedOut;
                    }
                    if next_send.is_some_and(|n| now >= n) {
                        log::debug!("[request] republishing {} ({})", msg.subject(), id);
                        if let Err(e) = conn.request(msg, id) {
                            self.forget(id);
                            return Err(e);
                        }
                        last_send = now;
                    }
                }
            }
        };

        self.forget(id);
        Ok(outcome)
    }

    /// Remember the callback of an asynchronous request so it can be cancelled.
    pub fn track(&self, id: &str, callback: Arc<dyn ReplyCallback>) -> Arc<AtomicBool> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.callbacks.lock().push(AsyncEntry {
            id: id.to_string(),
            callback,
            cancelled: Arc::clone(&cancelled),
        });
        cancelled
    }

    pub fn untrack(&self, id: &str) {
        self.callbacks.lock().retain(|e| e.id != id);
    }

    /// Cancel every pending request registered with `callback`.
    /// Returns `false` if there was none.
    pub fn cancel(&self, callback: &Arc<dyn ReplyCallback>) -> bool {
        let target = Arc::as_ptr(callback) as *const ();
        let mut found = false;
        self.callbacks.lock().retain(|e| {
            if Arc::as_ptr(&e.callback) as *const () == target {
                e.cancelled.store(true, Ordering::Release);
                self.pending.remove(&e.id);
                found = true;
                false
            } else {
                true
            }
        });
        found
    }

    /// Abandon every outstanding request.
    pub fn cancel_all(&self) {
        for entry in self.callbacks.lock().drain(..) {
            entry.cancelled.store(true, Ordering::Release);
        }
        self.pending.clear();
    }
}
