use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Per-user daily quota record, as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuotaRecord {
    pub id: String,
    pub daily_quota: u32,
    pub usage_count: u32,
    pub last_usage_date: NaiveDate,
}

impl UserQuotaRecord {
    pub fn new(id: impl Into<String>, daily_quota: u32) -> Self {
        Self {
            id: id.into(),
            daily_quota,
            usage_count: 0,
            last_usage_date: chrono::Local::now().date_naive(),
        }
    }

    /// Merge a partial write into this record
    pub fn apply(&mut self, patch: &QuotaPatch) {
        if let Some(count) = patch.usage_count {
            self.usage_count = count;
        }
        if let Some(date) = patch.last_usage_date {
            self.last_usage_date = date;
        }
    }

    /// Resolve the quota policy once for this record
    pub fn policy(&self, admin_id: Option<&str>) -> QuotaPolicy {
        if admin_id.is_some_and(|admin| admin == self.id) {
            QuotaPolicy::Exempt
        } else {
            QuotaPolicy::Enforced {
                daily_quota: self.daily_quota,
                usage_count: self.usage_count,
            }
        }
    }
}

/// Partial-merge write against a quota record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_usage_date: Option<NaiveDate>,
}

impl QuotaPatch {
    /// Increment written after a successful generation
    pub fn increment(current: &UserQuotaRecord, today: NaiveDate) -> Self {
        Self {
            usage_count: Some(current.usage_count.saturating_add(1)),
            last_usage_date: Some(today),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaPolicy {
    Enforced { daily_quota: u32, usage_count: u32 },
    Exempt,
}

impl QuotaPolicy {
    pub fn allows_generation(&self) -> bool {
        match self {
            QuotaPolicy::Enforced {
                daily_quota,
                usage_count,
            } => usage_count < daily_quota,
            QuotaPolicy::Exempt => true,
        }
    }

    /// `QuotaExceeded` when an enforced user has no generations left
    pub fn ensure_allowed(&self) -> AppResult<()> {
        match *self {
            QuotaPolicy::Enforced {
                daily_quota,
                usage_count,
            } if !self.allows_generation() => Err(AppError::QuotaExceeded {
                usage_count,
                daily_quota,
            }),
            _ => Ok(()),
        }
    }

    /// Generations left today, `None` when unlimited
    pub fn remaining(&self) -> Option<u32> {
        match self {
            QuotaPolicy::Enforced {
                daily_quota,
                usage_count,
            } => Some(daily_quota.saturating_sub(*usage_count)),
            QuotaPolicy::Exempt => None,
        }
    }

    pub fn is_exempt(&self) -> bool {
        matches!(self, QuotaPolicy::Exempt)
    }
}
