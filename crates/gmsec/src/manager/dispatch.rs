// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Auto-dispatch worker.
//!
//! ```text
//! loop {
//!     receive(100ms) ──> Some(msg) ──> callbacks of matching subscriptions
//!                   ├──> None      ──> next poll
//!                   └──> Err       ──> DISPATCH_FAILURE_EVENT, back off
//! }
//! ```
//!
//! The worker only holds a weak reference to the manager between polls, so
//! dropping the manager is never blocked by a pending receive.

use super::{ConnectionManager, ManagerInner};
use crate::config::DISPATCH_POLL_MS;
use crate::connection::ConnectionEvent;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

pub(crate) struct AutoDispatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl AutoDispatcher {
    pub fn start(manager: Weak<ManagerInner>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("gmsec-dispatch".into())
            .spawn(move || dispatch_loop(&manager, &flag))?;
        log::debug!("[dispatch] auto-dispatch started");
        Ok(Self {
            stop,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal the worker and, if `wait`, join it. A worker asked to stop from
    /// one of its own callbacks is never joined.
    pub fn stop(mut self, wait: bool) {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.thread.take() else {
            return;
        };
        if !wait || thread::current().id() == self.thread_id {
            return;
        }
        if handle.join().is_err() {
            log::error!("[dispatch] auto-dispatch thread panicked");
        }
        log::debug!("[dispatch] auto-dispatch stopped");
    }
}

impl Drop for AutoDispatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn dispatch_loop(manager: &Weak<ManagerInner>, stop: &AtomicBool) {
    let poll = Duration::from_millis(DISPATCH_POLL_MS);
    while !stop.load(Ordering::Acquire) {
        let Some(inner) = manager.upgrade() else {
            break;
        };
        let mgr = ConnectionManager::borrowed(inner);

        match mgr.receive(DISPATCH_POLL_MS as i32) {
            // Already dequeued: deliver even if a stop arrived meanwhile.
            Ok(Some(msg)) => mgr.dispatch_delivered(&msg),
            Ok(None) => {}
            Err(Error::NotInitialized) => break,
            Err(Error::Validation(report)) => {
                mgr.emit(ConnectionEvent::InvalidMessage, &report.to_string());
            }
            Err(e) => {
                log::warn!("[dispatch] receive failed: {}", e);
                mgr.emit(ConnectionEvent::DispatchFailed, &e.to_string());
                drop(mgr);
                thread::sleep(poll);
            }
        }
    }
    log::trace!("[dispatch] worker exiting");
}
