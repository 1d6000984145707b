// Record store seam: keyed quota records with change notification
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::AppResult;
use crate::models::{QuotaPatch, UserQuotaRecord};

pub mod file;
pub mod memory;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

/// Called with the full record on every change. Stores call listeners while
/// holding their write lock, so a listener must not call back into the store.
pub type Listener = Arc<dyn Fn(UserQuotaRecord) + Send + Sync>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Register `listener` for `key`. The current record, if any, is delivered
    /// before this returns.
    fn subscribe(&self, key: &str, listener: Listener) -> AppResult<Subscription>;

    /// Partial merge write. Listeners for `key` see the merged record.
    async fn update(&self, key: &str, patch: QuotaPatch) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Option<UserQuotaRecord>>;

    /// Create or replace a whole record
    async fn put(&self, record: UserQuotaRecord) -> AppResult<()>;
}

/// Handle to a live subscription. The disposer runs at most once, either on
/// `unsubscribe` or on drop.
pub struct Subscription {
    disposer: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposer: Mutex::new(Some(Box::new(disposer))),
        }
    }

    /// Returns true if this call released the subscription
    pub fn unsubscribe(&self) -> bool {
        let disposer = match self.disposer.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match disposer {
            Some(dispose) => {
                dispose();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.disposer
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Listener bookkeeping shared by the store implementations
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<DashMap<u64, (String, Listener)>>,
    next_id: Arc<AtomicU64>,
}

impl ListenerRegistry {
    pub fn register(&self, key: &str, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(id, (key.to_string(), listener));

        let listeners = self.listeners.clone();
        let key = key.to_string();
        Subscription::new(move || {
            listeners.remove(&id);
            tracing::debug!("Released subscription {} for {}", id, key);
        })
    }

    pub fn notify(&self, record: &UserQuotaRecord) {
        // Collect first: a listener may unsubscribe while being called
        let targets: Vec<Listener> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().0 == record.id)
            .map(|entry| entry.value().1.clone())
            .collect();

        for listener in targets {
            listener(record.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_disposer_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_filters_by_key() {
        let registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let sub = registry.register(
            "alice",
            Arc::new(move |r: UserQuotaRecord| sink.lock().unwrap().push(r.usage_count)),
        );

        let mut alice = UserQuotaRecord::new("alice", 5);
        alice.usage_count = 2;
        registry.notify(&alice);
        registry.notify(&UserQuotaRecord::new("bob", 5));
        assert_eq!(*seen.lock().unwrap(), vec![2]);

        sub.unsubscribe();
        assert!(registry.is_empty());
        registry.notify(&alice);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
