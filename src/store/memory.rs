use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Listener, ListenerRegistry, RecordStore, Subscription};
use crate::error::{AppError, AppResult};
use crate::models::{QuotaPatch, UserQuotaRecord};

/// In-process record store. Notifications are delivered synchronously from
/// the writing call, in write order.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<String, UserQuotaRecord>>,
    listeners: ListenerRegistry,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: UserQuotaRecord) -> Self {
        let store = Self::new();
        store.records.insert(record.id.clone(), record);
        store
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| AppError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn subscribe(&self, key: &str, listener: Listener) -> AppResult<Subscription> {
        let _guard = self.lock()?;
        let subscription = self.listeners.register(key, listener.clone());
        let current = self.records.get(key).map(|r| r.value().clone());
        if let Some(record) = current {
            listener(record);
        }
        Ok(subscription)
    }

    async fn update(&self, key: &str, patch: QuotaPatch) -> AppResult<()> {
        let _guard = self.lock()?;
        // Release the shard guard before notifying
        let merged = {
            let mut entry = self
                .records
                .get_mut(key)
                .ok_or_else(|| AppError::Store(format!("Record does not exist: {}", key)))?;
            entry.apply(&patch);
            entry.clone()
        };
        self.listeners.notify(&merged);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<UserQuotaRecord>> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, record: UserQuotaRecord) -> AppResult<()> {
        let _guard = self.lock()?;
        self.records.insert(record.id.clone(), record.clone());
        self.listeners.notify(&record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (Listener, Arc<Mutex<Vec<UserQuotaRecord>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Listener = Arc::new(move |r: UserQuotaRecord| sink.lock().unwrap().push(r));
        (listener, seen)
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_record() {
        let store = MemoryRecordStore::with_record(UserQuotaRecord::new("alice", 5));
        let (listener, seen) = collector();
        let _sub = store.subscribe("alice", listener).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_notifies() {
        let store = MemoryRecordStore::with_record(UserQuotaRecord::new("alice", 5));
        let (listener, seen) = collector();
        let _sub = store.subscribe("alice", listener).unwrap();

        store
            .update(
                "alice",
                QuotaPatch {
                    usage_count: Some(3),
                    last_usage_date: None,
                },
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].usage_count, 3);
        assert_eq!(seen[1].daily_quota, 5);
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let store = MemoryRecordStore::new();
        let result = store.update("ghost", QuotaPatch::default()).await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let store = MemoryRecordStore::new();
        let (listener, seen) = collector();
        let sub = store.subscribe("alice", listener).unwrap();
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);
        store.put(UserQuotaRecord::new("alice", 5)).await.unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_notify_in_write_order() {
        let store = MemoryRecordStore::with_record(UserQuotaRecord::new("alice", 500));
        let (listener, seen) = collector();
        let _sub = store.subscribe("alice", listener).unwrap();

        let mut tasks = Vec::new();
        for n in 1..=200u32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let patch = QuotaPatch {
                    usage_count: Some(n),
                    last_usage_date: None,
                };
                store.update("alice", patch).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = store.get("alice").await.unwrap().unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 201);
        assert_eq!(seen.last(), Some(&stored));
    }
}
