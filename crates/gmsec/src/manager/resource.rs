// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic resource-message publisher.
//!
//! The worker samples every `sample` interval and publishes every
//! `interval`, the first publish happening as soon as it starts.

use super::service::{ServiceControl, ServiceState};
use crate::config::{SERVICE_START_TIMEOUT_MS, SERVICE_STOP_TIMEOUT_MS};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Takes one sample into the moving-average window.
pub(crate) type SampleTick = Box<dyn Fn() + Send>;
/// Builds and publishes one resource message.
pub(crate) type PublishTick = Box<dyn Fn() -> Result<()> + Send>;

pub(crate) struct ResourceService {
    control: Arc<ServiceControl>,
    thread: Option<JoinHandle<()>>,
    thread_id: Option<ThreadId>,
}

impl ResourceService {
    pub fn start(
        interval: Duration,
        sample: Duration,
        on_sample: SampleTick,
        on_publish: PublishTick,
    ) -> Result<Self> {
        let control = Arc::new(ServiceControl::default());
        let worker = Arc::clone(&control);
        let thread = thread::Builder::new()
            .name("gmsec-resource".into())
            .spawn(move || resource_loop(&worker, interval, sample, &on_sample, &on_publish))?;

        let mut service = Self {
            thread_id: Some(thread.thread().id()),
            thread: Some(thread),
            control,
        };
        if !service
            .control
            .await_running(Duration::from_millis(SERVICE_START_TIMEOUT_MS))
        {
            service.shutdown();
            return Err(Error::ResourceServiceNotRunning(
                "Resource Message Service timed-out when attempting to start.".into(),
            ));
        }
        log::debug!(
            "[resource] service started (interval={:?}, sample={:?})",
            interval,
            sample
        );
        Ok(service)
    }

    pub fn is_running(&self) -> bool {
        self.control.state() != ServiceState::Stopped
    }

    /// `false` when the worker did not acknowledge within `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.control.request_stop();
        if !self.control.await_stopped(timeout) {
            log::warn!("[resource] service did not stop within {:?}", timeout);
            return false;
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("[resource] worker thread panicked");
            }
        }
        log::debug!("[resource] service stopped");
        true
    }

    fn shutdown(&mut self) {
        if self.thread_id == Some(thread::current().id()) {
            self.control.request_stop();
            self.thread.take();
            return;
        }
        if !self.stop(Duration::from_millis(SERVICE_STOP_TIMEOUT_MS)) {
            self.thread.take();
        }
    }
}

impl Drop for ResourceService {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}

fn resource_loop(
    control: &ServiceControl,
    interval: Duration,
    sample: Duration,
    on_sample: &SampleTick,
    on_publish: &PublishTick,
) {
    control.mark_running();
    let start = Instant::now();
    let mut next_sample = start;
    let mut next_publish = start;

    loop {
        let now = Instant::now();
        if now >= next_sample {
            on_sample();
            next_sample += sample;
            if next_sample <= now {
                next_sample = now + sample;
            }
        }
        if now >= next_publish {
            if let Err(e) = on_publish() {
                log::warn!("[resource] publish failed: {}", e);
            }
            next_publish += interval;
            if next_publish <= now {
                next_publish = now + interval;
            }
        }
        if control.sleep_until(next_sample.min(next_publish)) {
            break;
        }
    }

    control.mark_stopped();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_samples_more_often_than_it_publishes() {
        let samples = Arc::new(AtomicUsize::new(0));
        let publishes = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&samples);
        let p = Arc::clone(&publishes);

        let mut svc = ResourceService::start(
            Duration::from_millis(200),
            Duration::from_millis(40),
            Box::new(move || {
                s.fetch_add(1, Ordering::AcqRel);
            }),
            Box::new(move || {
                p.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(450));
        assert!(svc.stop(Duration::from_secs(2)));
        assert!(!svc.is_running());

        let published = publishes.load(Ordering::Acquire);
        assert!((2..=4).contains(&published), "published {}", published);
        assert!(samples.load(Ordering::Acquire) > published);
    }

    #[test]
    fn test_publish_errors_do_not_stop_the_worker() {
        let publishes = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&publishes);
        let mut svc = ResourceService::start(
            Duration::from_millis(30),
            Duration::from_millis(30),
            Box::new(|| {}),
            Box::new(move || {
                p.fetch_add(1, Ordering::AcqRel);
                Err(Error::Connection("down".into()))
            }),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(120));
        assert!(svc.is_running());
        assert!(svc.stop(Duration::from_secs(2)));
        assert!(publishes.load(Ordering::Acquire) >= 2);
    }
}
