use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{AppError, AppResult};
use crate::models::UserQuotaRecord;
use crate::store::{Listener, RecordStore, Subscription};

/// Local copy of one user's quota record, kept current by a store
/// subscription. Holds only the latest notification; nothing is queued.
pub struct UserRecordMirror {
    user_id: String,
    latest: watch::Receiver<Option<UserQuotaRecord>>,
    subscription: Subscription,
}

impl UserRecordMirror {
    pub fn subscribe(store: &dyn RecordStore, user_id: &str) -> AppResult<Self> {
        let (tx, latest) = watch::channel(None);
        let listener: Listener = Arc::new(move |record: UserQuotaRecord| {
            // Last write wins, even with no receiver borrowing
            tx.send_replace(Some(record));
        });
        let subscription = store.subscribe(user_id, listener)?;
        tracing::info!("Subscribed to quota record of {}", user_id);

        Ok(Self {
            user_id: user_id.to_string(),
            latest,
            subscription,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn current(&self) -> Option<UserQuotaRecord> {
        self.latest.borrow().clone()
    }

    /// Wait until the mirrored record satisfies `predicate`, checking the
    /// current value first.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&UserQuotaRecord) -> bool,
    ) -> AppResult<UserQuotaRecord> {
        let mut rx = self.latest.clone();
        let value = rx
            .wait_for(|v| v.as_ref().is_some_and(&mut predicate))
            .await
            .map_err(|_| AppError::Store("Record subscription closed".to_string()))?;
        value
            .clone()
            .ok_or_else(|| AppError::Store("Record missing".to_string()))
    }

    /// Release the store subscription. Only the first call has an effect.
    pub fn unsubscribe(&self) -> bool {
        let released = self.subscription.unsubscribe();
        if released {
            tracing::info!("Unsubscribed from quota record of {}", self.user_id);
        }
        released
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }
}
