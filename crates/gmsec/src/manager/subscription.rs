// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outstanding subscriptions of one manager.

use super::callback::MessageCallback;
use crate::config::Config;
use crate::connection::SubscriptionHandle;
use crate::subject;
use std::fmt;
use std::sync::Arc;

/// Handle returned by `subscribe`; pass it back to `unsubscribe`.
///
/// Clones refer to the same subscription. Once unsubscribed, every clone is
/// rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    manager: u64,
    id: u64,
    subject: String,
    config: Config,
    has_callback: bool,
}

impl SubscriptionInfo {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn has_callback(&self) -> bool {
        self.has_callback
    }

    pub(crate) fn manager(&self) -> u64 {
        self.manager
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for SubscriptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionInfo")
            .field("subject", &self.subject)
            .field("id", &self.id)
            .field("has_callback", &self.has_callback)
            .finish()
    }
}

struct Entry {
    id: u64,
    pattern: String,
    handle: SubscriptionHandle,
    /// One adapter per subscription, even when the same callback is shared.
    callback: Option<Arc<dyn MessageCallback>>,
}

/// Ordered list of live subscriptions.
pub(crate) struct SubscriptionRegistry {
    manager: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

impl SubscriptionRegistry {
    pub fn new(manager: u64) -> Self {
        Self {
            manager,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn insert(
        &mut self,
        pattern: &str,
        config: &Config,
        handle: SubscriptionHandle,
        callback: Option<Arc<dyn MessageCallback>>,
    ) -> SubscriptionInfo {
        self.next_id += 1;
        let info = SubscriptionInfo {
            manager: self.manager,
            id: self.next_id,
            subject: pattern.to_string(),
            config: config.clone(),
            has_callback: callback.is_some(),
        };
        self.entries.push(Entry {
            id: self.next_id,
            pattern: pattern.to_string(),
            handle,
            callback,
        });
        info
    }

    /// Transport handle of a live subscription issued by this registry.
    pub fn handle_of(&self, info: &SubscriptionInfo) -> Option<SubscriptionHandle> {
        if info.manager() != self.manager {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.id == info.id())
            .map(|e| e.handle)
    }

    /// Forget a subscription, dropping its callback adapter.
    pub fn remove(&mut self, info: &SubscriptionInfo) -> bool {
        if info.manager() != self.manager {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|e| e.id != info.id());
        self.entries.len() != before
    }

    /// Callbacks whose pattern matches `subject`, in subscription order.
    pub fn callbacks_for(&self, subject: &str) -> Vec<Arc<dyn MessageCallback>> {
        self.entries
            .iter()
            .filter(|e| subject::matches(&e.pattern, subject))
            .filter_map(|e| e.callback.clone())
            .collect()
    }

    /// Empty the registry, returning the transport handles to release.
    pub fn drain(&mut self) -> Vec<SubscriptionHandle> {
        self.entries.drain(..).map(|e| e.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ConnectionManager;
    use crate::message::Message;

    fn noop() -> Arc<dyn MessageCallback> {
        Arc::new(|_: &ConnectionManager, _: &Message| {})
    }

    #[test]
    fn test_insert_remove_symmetry() {
        let mut reg = SubscriptionRegistry::new(1);
        let info = reg.insert("GMSEC.>", &Config::new(), SubscriptionHandle::new(1, 1), Some(noop()));
        assert_eq!(reg.len(), 1);
        assert!(reg.handle_of(&info).is_some());
        assert!(reg.remove(&info));
        assert!(reg.is_empty());
        assert!(!reg.remove(&info));
    }

    #[test]
    fn test_foreign_info_rejected() {
        let mut mine = SubscriptionRegistry::new(1);
        let mut other = SubscriptionRegistry::new(2);
        let foreign = other.insert("A", &Config::new(), SubscriptionHandle::new(2, 1), None);
        mine.insert("A", &Config::new(), SubscriptionHandle::new(1, 1), None);
        assert!(mine.handle_of(&foreign).is_none());
        assert!(!mine.remove(&foreign));
        assert_eq!(mine.len(), 1);
    }

    #[test]
    fn test_shared_callback_gets_one_adapter_per_subscription() {
        let mut reg = SubscriptionRegistry::new(1);
        let cb = noop();
        let a = reg.insert("GMSEC.A", &Config::new(), SubscriptionHandle::new(1, 1), Some(cb.clone()));
        reg.insert("GMSEC.*", &Config::new(), SubscriptionHandle::new(1, 2), Some(cb));
        assert_eq!(reg.callbacks_for("GMSEC.A").len(), 2);
        reg.remove(&a);
        assert_eq!(reg.callbacks_for("GMSEC.A").len(), 1);
        assert_eq!(reg.drain().len(), 1);
    }
}
