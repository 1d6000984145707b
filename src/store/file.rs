use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{Listener, ListenerRegistry, RecordStore, Subscription};
use crate::error::{AppError, AppResult};
use crate::models::{QuotaPatch, UserQuotaRecord};

/// One JSON document per user under `dir`. Also acts as the daily reset
/// process: a record last used before today is read back with a zero count,
/// and subscribers are told about the reset like any other write.
pub struct FileRecordStore {
    dir: PathBuf,
    listeners: ListenerRegistry,
    // Held across read-modify-write and the notification that follows it
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self {
            dir,
            listeners: ListenerRegistry::default(),
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| AppError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn record_path(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Load a record, applying the daily reset if it is stale. Callers hold
    /// `write_lock`.
    fn load(&self, key: &str) -> AppResult<Option<UserQuotaRecord>> {
        let path = self.record_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let mut record: UserQuotaRecord = serde_json::from_str(&content)?;
        if roll_over(&mut record, today()) {
            tracing::info!("Daily usage reset for {}", record.id);
            write_atomic(&path, &record)?;
            self.listeners.notify(&record);
        }
        Ok(Some(record))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    fn subscribe(&self, key: &str, listener: Listener) -> AppResult<Subscription> {
        let _guard = self.lock()?;
        let current = self.load(key)?;
        let subscription = self.listeners.register(key, listener.clone());
        if let Some(record) = current {
            listener(record);
        }
        Ok(subscription)
    }

    async fn update(&self, key: &str, patch: QuotaPatch) -> AppResult<()> {
        let _guard = self.lock()?;
        let mut record = self
            .load(key)?
            .ok_or_else(|| AppError::Store(format!("Record does not exist: {}", key)))?;
        record.apply(&patch);
        write_atomic(&self.record_path(key)?, &record)?;
        self.listeners.notify(&record);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<UserQuotaRecord>> {
        let _guard = self.lock()?;
        self.load(key)
    }

    async fn put(&self, record: UserQuotaRecord) -> AppResult<()> {
        let _guard = self.lock()?;
        write_atomic(&self.record_path(&record.id)?, &record)?;
        self.listeners.notify(&record);
        Ok(())
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn roll_over(record: &mut UserQuotaRecord, today: NaiveDate) -> bool {
    if record.last_usage_date != today && record.usage_count != 0 {
        record.usage_count = 0;
        true
    } else {
        false
    }
}

/// Keys become file names, so keep them to a safe alphabet
fn validate_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(AppError::Store(format!("Invalid record key: {:?}", key)))
    }
}

/// Write to a temp file, then rename over the target
fn write_atomic(path: &Path, record: &UserQuotaRecord) -> AppResult<()> {
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(record)?;
    fs::write(&temp_path, content)?;
    fs::rename(temp_path, path)?;
    Ok(())
}
