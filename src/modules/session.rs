//! Generation session controller.
//!
//! Owns the per-session state machine and sequences the external effects of
//! one attempt: quota precondition against the mirrored record, the single
//! in-flight generation call, handing the image to the presenter, and only
//! then the usage write.
//!
//! The quota check reads the mirror at submit time and the write sets
//! `usage_count = mirrored + 1` without a conditional update. Two sessions of
//! the same user submitting at once can therefore both pass the check.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::models::{GenerationRequest, Preset, QuotaPatch, QuotaPolicy};
use crate::modules::mirror::UserRecordMirror;
use crate::modules::presenter::ResultPresenter;
use crate::modules::{presets, prompt};
use crate::store::RecordStore;
use crate::upstream::{mapper, ImageGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Configuration,
    QuotaExceeded,
    EmptyPrompt,
    ExternalCall,
    NoImageProduced,
}

impl From<&AppError> for FailureKind {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Configuration(_) => FailureKind::Configuration,
            AppError::QuotaExceeded { .. } => FailureKind::QuotaExceeded,
            AppError::EmptyPrompt => FailureKind::EmptyPrompt,
            AppError::NoImageProduced => FailureKind::NoImageProduced,
            _ => FailureKind::ExternalCall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Composing,
    Generating {
        request: GenerationRequest,
    },
    Succeeded {
        request: GenerationRequest,
        completed_at: DateTime<Utc>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Composing => "composing",
            SessionState::Generating { .. } => "generating",
            SessionState::Succeeded { .. } => "succeeded",
            SessionState::Failed { .. } => "failed",
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, SessionState::Generating { .. })
    }
}

/// What happened to the usage write after a success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsageWrite {
    Recorded,
    Exempt,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubmitOutcome {
    /// Another attempt is in flight; nothing changed
    Busy,
    Failed(FailureKind),
    Succeeded { usage: UsageWrite },
}

/// Serializable view for front-ends
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub state: &'static str,
    pub selected_preset: Option<&'static str>,
    pub free_text: String,
    pub usage_count: Option<u32>,
    pub daily_quota: Option<u32>,
    /// `None` when there is no record or the user is exempt
    pub remaining_quota: Option<u32>,
    pub unlimited: bool,
    pub message: Option<String>,
    pub notice: Option<String>,
    pub has_image: bool,
}

struct SessionInner {
    state: SessionState,
    selected_preset: Option<&'static Preset>,
    free_text: String,
}

impl SessionInner {
    /// Edits move a settled session back to composing. An in-flight attempt
    /// keeps its state.
    fn touch(&mut self) {
        if !self.state.is_generating() {
            self.state = SessionState::Composing;
        }
    }
}

pub struct SessionSettings {
    pub model: String,
    pub admin_user_id: Option<String>,
}

pub struct GenerationSession {
    settings: SessionSettings,
    mirror: UserRecordMirror,
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn ImageGenerator>,
    presenter: Arc<ResultPresenter>,
    inner: Mutex<SessionInner>,
}

impl GenerationSession {
    pub fn new(
        settings: SessionSettings,
        mirror: UserRecordMirror,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn ImageGenerator>,
        presenter: Arc<ResultPresenter>,
    ) -> Self {
        Self {
            settings,
            mirror,
            store,
            generator,
            presenter,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                selected_preset: None,
                free_text: String::new(),
            }),
        }
    }

    /// Subscribe to `user_id`'s record and build a session around it
    pub fn open(
        user_id: &str,
        settings: SessionSettings,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn ImageGenerator>,
        presenter: Arc<ResultPresenter>,
    ) -> crate::error::AppResult<Self> {
        let mirror = UserRecordMirror::subscribe(store.as_ref(), user_id)?;
        Ok(Self::new(settings, mirror, store, generator, presenter))
    }

    pub fn user_id(&self) -> &str {
        self.mirror.user_id()
    }

    pub fn mirror(&self) -> &UserRecordMirror {
        &self.mirror
    }

    pub fn presenter(&self) -> &Arc<ResultPresenter> {
        &self.presenter
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn selected_preset(&self) -> Option<&'static Preset> {
        self.inner.lock().await.selected_preset
    }

    /// Select a preset, or deselect it if it is already selected. Unknown ids
    /// clear the selection.
    pub async fn toggle_preset(&self, preset_id: &str) -> Option<&'static Preset> {
        let mut inner = self.inner.lock().await;
        inner.selected_preset = match (inner.selected_preset, presets::lookup(preset_id)) {
            (Some(current), Some(next)) if current.id == next.id => None,
            (_, next) => next,
        };
        inner.touch();
        inner.selected_preset
    }

    pub async fn set_free_text(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.free_text = text.into();
        inner.touch();
    }

    /// Run one generation attempt. Every failure is reported through the
    /// presenter; nothing is retried.
    pub async fn submit(&self) -> SubmitOutcome {
        let (request, policy) = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_generating() {
                debug!("Submit ignored, a generation is already in flight");
                return SubmitOutcome::Busy;
            }

            let Some(record) = self.mirror.current() else {
                let err = AppError::Configuration("User record is not available".to_string());
                warn!("Submit for {} without a user record", self.user_id());
                self.presenter.report(err.to_string()).await;
                return SubmitOutcome::Failed(FailureKind::Configuration);
            };

            let policy = record.policy(self.settings.admin_user_id.as_deref());
            let prepared = self.check_preconditions(&inner, &policy);
            match prepared {
                Ok(prompt) => {
                    let request = GenerationRequest::new(
                        prompt,
                        inner.selected_preset.map(|p| p.id.to_string()),
                    );
                    inner.state = SessionState::Generating {
                        request: request.clone(),
                    };
                    (request, policy)
                }
                Err(err) => {
                    let kind = FailureKind::from(&err);
                    info!("Submit rejected for {}: {}", self.user_id(), err);
                    self.presenter.report(err.to_string()).await;
                    inner.state = SessionState::Failed {
                        kind,
                        message: err.to_string(),
                    };
                    return SubmitOutcome::Failed(kind);
                }
            }
        };

        // The previous image stays visible while this attempt runs
        self.presenter.clear_messages().await;
        info!(
            "Generation {} started for {} (preset: {:?})",
            request.id,
            self.user_id(),
            request.preset_id
        );

        let result = self
            .generator
            .generate(&request.prompt, &self.settings.model)
            .await
            .and_then(mapper::extract_image);

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                let kind = FailureKind::from(&err);
                warn!("Generation {} failed: {}", request.id, err);
                self.presenter.fail(err.to_string()).await;
                self.inner.lock().await.state = SessionState::Failed {
                    kind,
                    message: err.to_string(),
                };
                return SubmitOutcome::Failed(kind);
            }
        };

        // Image first, usage write second
        self.presenter.show(image).await;
        let usage = self.record_usage(&policy).await;

        self.inner.lock().await.state = SessionState::Succeeded {
            request,
            completed_at: Utc::now(),
        };
        SubmitOutcome::Succeeded { usage }
    }

    fn check_preconditions(
        &self,
        inner: &SessionInner,
        policy: &QuotaPolicy,
    ) -> Result<String, AppError> {
        if !self.generator.has_credential() {
            return Err(AppError::Configuration(
                "API key is not configured".to_string(),
            ));
        }

        policy.ensure_allowed()?;

        prompt::compose(inner.selected_preset, &inner.free_text)
    }

    async fn record_usage(&self, policy: &QuotaPolicy) -> UsageWrite {
        if policy.is_exempt() {
            debug!("{} is exempt from quota, skipping usage write", self.user_id());
            return UsageWrite::Exempt;
        }

        // Count from the freshest mirrored value
        let Some(record) = self.mirror.current() else {
            error!("User record vanished before usage write for {}", self.user_id());
            let err = AppError::QuotaWrite("user record is not available".to_string());
            self.presenter.notice(err.to_string()).await;
            return UsageWrite::Failed;
        };

        let patch = QuotaPatch::increment(&record, chrono::Local::now().date_naive());
        match self.store.update(self.user_id(), patch).await {
            Ok(()) => {
                info!(
                    "Recorded usage for {} ({} -> {})",
                    self.user_id(),
                    record.usage_count,
                    record.usage_count.saturating_add(1)
                );
                UsageWrite::Recorded
            }
            Err(e) => {
                error!("Usage write failed for {}: {}", self.user_id(), e);
                let err = AppError::QuotaWrite(e.to_string());
                self.presenter.notice(err.to_string()).await;
                UsageWrite::Failed
            }
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let (state, selected_preset, free_text) = {
            let inner = self.inner.lock().await;
            (
                inner.state.name(),
                inner.selected_preset.map(|p| p.id),
                inner.free_text.clone(),
            )
        };
        let record = self.mirror.current();
        let policy = record
            .as_ref()
            .map(|r| r.policy(self.settings.admin_user_id.as_deref()));

        SessionSnapshot {
            user_id: self.user_id().to_string(),
            state,
            selected_preset,
            free_text,
            usage_count: record.as_ref().map(|r| r.usage_count),
            daily_quota: record.as_ref().map(|r| r.daily_quota),
            remaining_quota: policy.and_then(|p| p.remaining()),
            unlimited: policy.is_some_and(|p| p.is_exempt()),
            message: self.presenter.message().await,
            notice: self.presenter.notice_text().await,
            has_image: self.presenter.has_image().await,
        }
    }

    /// Release the record subscription. Safe to call more than once.
    pub fn shutdown(&self) -> bool {
        self.mirror.unsubscribe()
    }
}
