// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Start/stop handshake shared by the heartbeat and resource services.
//!
//! ```text
//! Stopped -> Starting -> Running -> Stopping -> Stopped
//!   caller    spawn      worker     caller      worker
//! ```
//!
//! The worker sleeps on a condition variable between cycles, so a stop
//! request (or a live interval change) wakes it immediately.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub(crate) struct ServiceControl {
    state: Mutex<ServiceState>,
    changed: Condvar,
}

impl Default for ServiceControl {
    fn default() -> Self {
        Self {
            state: Mutex::new(ServiceState::Starting),
            changed: Condvar::new(),
        }
    }
}

impl ServiceControl {
    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    fn set(&self, state: ServiceState) {
        *self.state.lock() = state;
        self.changed.notify_all();
    }

    /// Worker side: report the loop has started.
    pub fn mark_running(&self) {
        let mut state = self.state.lock();
        if *state == ServiceState::Starting {
            *state = ServiceState::Running;
            self.changed.notify_all();
        }
    }

    /// Worker side: report the loop has exited.
    pub fn mark_stopped(&self) {
        self.set(ServiceState::Stopped);
    }

    /// Caller side: ask the worker to finish its current cycle and exit.
    pub fn request_stop(&self) {
        let mut state = self.state.lock();
        if *state != ServiceState::Stopped {
            *state = ServiceState::Stopping;
            self.changed.notify_all();
        }
    }

    /// Wake the worker without changing state.
    pub fn poke(&self) {
        self.changed.notify_all();
    }

    /// Block until the worker is Running (true) or the timeout elapses.
    pub fn await_running(&self, timeout: Duration) -> bool {
        self.await_until(timeout, |s| s == ServiceState::Running)
    }

    /// Block until the worker is Stopped (true) or the timeout elapses.
    pub fn await_stopped(&self, timeout: Duration) -> bool {
        self.await_until(timeout, |s| s == ServiceState::Stopped)
    }

    fn await_until(&self, timeout: Duration, done: impl Fn(ServiceState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !done(*state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return done(*state);
            }
        }
        true
    }

    /// Worker side: sleep until `deadline`, a poke, or a stop request.
    /// Returns `true` when the worker should exit.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        if *state == ServiceState::Stopping {
            return true;
        }
        if Instant::now() < deadline {
            self.changed.wait_until(&mut state, deadline);
        }
        *state == ServiceState::Stopping
    }
}
