// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic heartbeat publisher.
//!
//! The service owns a prototype message. Each cycle clones the current
//! prototype, stamps COUNTER (and MSG-ID for the 2014 ISD) and hands it to
//! the publisher. Live updates swap in a new prototype, so the worker never
//! waits on a caller lock to read it.
//!
//! ```text
//! caller: set_field(F) ─lock writer─> clone prototype + F ─> ArcSwap::store
//! worker: ArcSwap::load ─> clone ─> COUNTER=n ─> publish ─> sleep(PUB-RATE)
//! ```

use super::populator::{heartbeat_msg_id, COUNTER, MSG_ID, PUB_RATE};
use super::service::{ServiceControl, ServiceState};
use crate::config::{SERVICE_START_TIMEOUT_MS, SERVICE_STOP_TIMEOUT_MS};
use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::message::Message;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Sends one finished message on behalf of a service.
pub(crate) type Publisher = Arc<dyn Fn(&Message) -> Result<()> + Send + Sync>;

struct HeartbeatShared {
    control: ServiceControl,
    prototype: ArcSwap<Message>,
    /// Serialises prototype read-modify-write by callers.
    writer: Mutex<()>,
    counter: AtomicU64,
    interval_ms: AtomicU64,
    /// 2014 ISD: I16 counter wrapping at 32767, MSG-ID per cycle.
    legacy: bool,
}

impl HeartbeatShared {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Acquire))
    }

    fn counter_value(&self, counter: u64) -> FieldValue {
        if self.legacy {
            FieldValue::I16(counter as i16)
        } else {
            FieldValue::U16(counter as u16)
        }
    }

    fn next_counter(&self, counter: u64) -> u64 {
        let limit = if self.legacy {
            i16::MAX as u64
        } else {
            u16::MAX as u64
        };
        if counter >= limit {
            1
        } else {
            counter + 1
        }
    }

    fn publish_once(&self, publisher: &Publisher) {
        let counter = self.counter.load(Ordering::Acquire);
        let mut msg = Message::clone(&self.prototype.load());
        let stamped = msg
            .add_field(Field::new(COUNTER, self.counter_value(counter)))
            .and_then(|_| {
                if self.legacy {
                    msg.add(MSG_ID, heartbeat_msg_id(counter)).map(|_| ())
                } else {
                    Ok(())
                }
            });

        match stamped.and_then(|()| publisher(&msg)) {
            Ok(()) => log::trace!(
                "[heartbeat] published {} COUNTER={}",
                msg.subject(),
                counter
            ),
            Err(e) => log::warn!("[heartbeat] publish of {} failed: {}", msg.subject(), e),
        }

        // A caller may have set COUNTER while we were publishing; keep theirs.
        let _ = self.counter.compare_exchange(
            counter,
            self.next_counter(counter),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Running heartbeat service. Dropping it stops the worker.
pub(crate) struct HeartbeatService {
    shared: Arc<HeartbeatShared>,
    thread: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
}

impl HeartbeatService {
    /// Spawn the worker and wait until it reports Running.
    pub fn start(
        prototype: Message,
        interval: Duration,
        legacy: bool,
        publisher: Publisher,
    ) -> Result<Self> {
        let start_counter = prototype
            .get_field(COUNTER)
            .and_then(|f| f.as_u64().ok())
            .filter(|c| *c > 0)
            .unwrap_or(1);
        let shared = Arc::new(HeartbeatShared {
            control: ServiceControl::default(),
            prototype: ArcSwap::from_pointee(prototype),
            writer: Mutex::new(()),
            counter: AtomicU64::new(start_counter),
            interval_ms: AtomicU64::new(
                u64::try_from(interval.as_millis().max(1)).unwrap_or(u64::MAX),
            ),
            legacy,
        });

        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("gmsec-heartbeat".into())
            .spawn(move || heartbeat_loop(&worker, &publisher))?;

        let mut service = Self {
            thread_id: Some(thread.thread().id()),
            thread: Some(thread),
            shared,
        };

        if !service
            .shared
            .control
            .await_running(Duration::from_millis(SERVICE_START_TIMEOUT_MS))
        {
            service.shutdown();
            return Err(Error::HeartbeatServiceNotRunning(
                "Heartbeat Service timed-out when attempting to start.".into(),
            ));
        }
        log::debug!(
            "[heartbeat] service started (interval={:?})",
            service.shared.interval()
        );
        Ok(service)
    }

    pub fn is_running(&self) -> bool {
        self.shared.control.state() != ServiceState::Stopped
    }

    /// Ask the worker to stop and wait up to `timeout`. On timeout the
    /// service is left in place and `false` is returned.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.shared.control.request_stop();
        if !self.shared.control.await_stopped(timeout) {
            log::warn!(
                "[heartbeat] service did not stop within {:?}",
                timeout
            );
            return false;
        }
        self.join();
        log::debug!("[heartbeat] service stopped");
        true
    }

    pub fn prototype(&self) -> Arc<Message> {
        self.shared.prototype.load_full()
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Next COUNTER value the worker will publish.
    pub fn counter(&self) -> u64 {
        self.shared.counter.load(Ordering::Acquire)
    }

    /// Update a live field.
    ///
    /// PUB-RATE and COUNTER take effect on the next cycle; other fields are
    /// checked with `check` on a copy of the prototype first. Returns `true`
    /// when a field of that name already existed.
    pub fn set_field(&self, field: &Field, check: impl Fn(&Message) -> Result<()>) -> Result<bool> {
        let _writer = self.shared.writer.lock();
        let current = self.shared.prototype.load_full();
        let existed = current.has_field(field.name());

        match field.name() {
            PUB_RATE => {
                let rate = non_negative(field)?;
                if rate == 0 {
                    return Err(Error::Configuration(
                        "PUB-RATE must be greater than zero".into(),
                    ));
                }
                self.shared
                    .interval_ms
                    .store(rate.saturating_mul(1000), Ordering::Release);
                let mut next = Message::clone(&current);
                next.add_field(field.clone())?;
                self.shared.prototype.store(Arc::new(next));
                self.shared.control.poke();
            }
            COUNTER => {
                let counter = non_negative(field)?;
                self.shared.counter.store(counter, Ordering::Release);
            }
            _ => {
                let mut next = Message::clone(&current);
                next.add_field(field.clone())?;
                if let Err(e) = check(&next) {
                    log::warn!("[heartbeat] field {} rejected: {}", field.name(), e);
                    return Err(e);
                }
                self.shared.prototype.store(Arc::new(next));
            }
        }
        Ok(existed)
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("[heartbeat] worker thread panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        self.shared.control.request_stop();
        if self.thread_id == Some(thread::current().id()) {
            self.thread.take();
            return;
        }
        if self
            .shared
            .control
            .await_stopped(Duration::from_millis(SERVICE_STOP_TIMEOUT_MS))
        {
            self.join();
        } else {
            self.thread.take();
        }
    }
}

impl Drop for HeartbeatService {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

fn non_negative(field: &Field) -> Result<u64> {
    let value = field.as_i64()?;
    if value < 0 {
        return Err(Error::ValueOutOfRange(format!(
            "Setting {} to less than zero is not permitted",
            field.name()
        )));
    }
    Ok(value as u64)
}

fn heartbeat_loop(shared: &HeartbeatShared, publisher: &Publisher) {
    shared.control.mark_running();
    let mut last: Option<Instant> = None;

    loop {
        let interval = shared.interval();
        let due = last.map_or_else(Instant::now, |t| t + interval);
        let now = Instant::now();
        if now >= due {
            shared.publish_once(publisher);
            // Anchor on the schedule, not on when the publish finished.
            last = Some(if now.duration_since(due) > interval {
                now
            } else {
                due
            });
            continue;
        }
        if shared.control.sleep_until(due) {
            break;
        }
    }

    shared.control.mark_stopped();
}
