// Command surface called by the front-end
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;
use crate::modules::{
    self, GenerationSession, ResultPresenter, SessionSettings, SessionSnapshot, SubmitOutcome,
};
use crate::store::RecordStore;
use crate::upstream::ImageGenerator;

/// Studio global state
pub struct StudioState {
    pub instance: Arc<RwLock<Option<SessionInstance>>>,
    pub config: RwLock<AppConfig>,
    pub data_dir: PathBuf,
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn ImageGenerator>,
}

/// One signed-in user's session
pub struct SessionInstance {
    pub session: Arc<GenerationSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetView {
    pub category: &'static str,
    pub category_label: &'static str,
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
    pub snapshot: SessionSnapshot,
}

impl StudioState {
    pub fn new(
        config: AppConfig,
        data_dir: PathBuf,
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            instance: Arc::new(RwLock::new(None)),
            config: RwLock::new(config),
            data_dir,
            store,
            generator,
        }
    }

    async fn current_session(&self) -> AppResult<Arc<GenerationSession>> {
        self.instance
            .read()
            .await
            .as_ref()
            .map(|i| i.session.clone())
            .ok_or_else(|| AppError::Configuration("Session is not running".to_string()))
    }
}

/// Start a session for `user_id`
pub async fn start_session(state: &StudioState, user_id: &str) -> AppResult<SessionSnapshot> {
    let mut instance_lock = state.instance.write().await;

    // Prevent duplicate start
    if instance_lock.is_some() {
        return Err(AppError::Configuration(
            "Session is already running".to_string(),
        ));
    }

    let settings = {
        let config = state.config.read().await;
        SessionSettings {
            model: config.model.clone(),
            admin_user_id: config.admin_user_id.clone(),
        }
    };

    let session = Arc::new(GenerationSession::open(
        user_id,
        settings,
        state.store.clone(),
        state.generator.clone(),
        Arc::new(ResultPresenter::new()),
    )?);
    let snapshot = session.snapshot().await;
    *instance_lock = Some(SessionInstance { session });

    tracing::info!("Session started for {}", user_id);
    Ok(snapshot)
}

/// End the session and release its record subscription
pub async fn end_session(state: &StudioState) -> AppResult<()> {
    let mut instance_lock = state.instance.write().await;

    let Some(instance) = instance_lock.take() else {
        return Err(AppError::Configuration("Session is not running".to_string()));
    };
    instance.session.shutdown();
    tracing::info!("Session ended for {}", instance.session.user_id());
    Ok(())
}

/// Presets in catalog order, labelled in the configured language
pub async fn list_presets(state: &StudioState) -> Vec<PresetView> {
    let language = state.config.read().await.language.clone();
    modules::presets::categories()
        .iter()
        .flat_map(|category| {
            let language = language.clone();
            category.presets.iter().map(move |preset| PresetView {
                category: category.id,
                category_label: category.label.get(&language),
                id: preset.id,
                label: preset.label(&language),
            })
        })
        .collect()
}

pub async fn toggle_preset(state: &StudioState, preset_id: &str) -> AppResult<SessionSnapshot> {
    let session = state.current_session().await?;
    session.toggle_preset(preset_id).await;
    Ok(session.snapshot().await)
}

pub async fn set_free_text(state: &StudioState, text: String) -> AppResult<SessionSnapshot> {
    let session = state.current_session().await?;
    session.set_free_text(text).await;
    Ok(session.snapshot().await)
}

/// Submit the current composition. Generation errors are part of the
/// response, not an `Err`.
pub async fn submit_generation(state: &StudioState) -> AppResult<SubmitResponse> {
    // Do not hold the instance lock across the generation call
    let session = state.current_session().await?;
    let outcome = session.submit().await;
    Ok(SubmitResponse {
        outcome,
        snapshot: session.snapshot().await,
    })
}

pub async fn get_session_snapshot(state: &StudioState) -> AppResult<SessionSnapshot> {
    Ok(state.current_session().await?.snapshot().await)
}

/// Export the shown image to the configured folder, or `<data_dir>/exports`
pub async fn export_image(state: &StudioState) -> AppResult<Option<PathBuf>> {
    let session = state.current_session().await?;
    let dir = state
        .config
        .read()
        .await
        .default_export_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| state.data_dir.join("exports"));
    session.presenter().export(&dir).await
}

pub async fn image_data_url(state: &StudioState) -> AppResult<Option<String>> {
    Ok(state.current_session().await?.presenter().data_url().await)
}

pub async fn load_config(state: &StudioState) -> AppResult<AppConfig> {
    Ok(state.config.read().await.clone())
}

/// Persist config. Takes effect for the next session.
pub async fn save_config(state: &StudioState, config: AppConfig) -> AppResult<()> {
    modules::config::save_app_config_to(&state.data_dir, &config)?;
    let mut current = state.config.write().await;
    let api_key = current.api_key.take();
    *current = AppConfig { api_key, ..config };
    Ok(())
}

pub async fn clear_log_cache(state: &StudioState) -> AppResult<()> {
    modules::logger::clear_logs(&state.data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentPart, UserQuotaRecord};
    use crate::store::MemoryRecordStore;
    use async_trait::async_trait;

    struct StaticGenerator;

    #[async_trait]
    impl ImageGenerator for StaticGenerator {
        fn has_credential(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &str, _model: &str) -> AppResult<Vec<ContentPart>> {
            Ok(vec![ContentPart::InlineData {
                mime_type: "image/png".to_string(),
                data: b"\x89PNG".to_vec(),
            }])
        }
    }

    fn studio(dir: &std::path::Path, store: MemoryRecordStore) -> StudioState {
        let mut config = AppConfig::new();
        config.language = "en".to_string();
        config.default_export_path = Some(dir.join("out").to_string_lossy().to_string());
        StudioState::new(
            config,
            dir.to_path_buf(),
            Arc::new(store),
            Arc::new(StaticGenerator),
        )
    }

    #[tokio::test]
    async fn test_full_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryRecordStore::with_record(UserQuotaRecord::new("alice", 2));
        let state = studio(dir.path(), store.clone());

        let snapshot = start_session(&state, "alice").await.unwrap();
        assert_eq!(snapshot.remaining_quota, Some(2));
        assert!(start_session(&state, "alice").await.is_err());

        toggle_preset(&state, "rooftop-terrace").await.unwrap();
        set_free_text(&state, "at night".to_string()).await.unwrap();

        let response = submit_generation(&state).await.unwrap();
        assert!(matches!(response.outcome, SubmitOutcome::Succeeded { .. }));
        assert_eq!(response.snapshot.remaining_quota, Some(1));
        assert!(response.snapshot.has_image);

        let path = export_image(&state).await.unwrap().unwrap();
        assert!(path.starts_with(dir.path().join("out")));

        end_session(&state).await.unwrap();
        assert_eq!(store.listener_count(), 0);
        assert!(end_session(&state).await.is_err());
        assert!(get_session_snapshot(&state).await.is_err());
    }

    #[tokio::test]
    async fn test_list_presets_uses_language() {
        let dir = tempfile::tempdir().unwrap();
        let state = studio(dir.path(), MemoryRecordStore::new());
        let presets = list_presets(&state).await;
        assert!(presets
            .iter()
            .any(|p| p.id == "tropical-resort" && p.label == "Tropical Resort"));

        let mut config = load_config(&state).await.unwrap();
        config.language = "vi".to_string();
        save_config(&state, config).await.unwrap();
        let presets = list_presets(&state).await;
        assert_eq!(presets[0].category_label, "Ngoại thất");
    }
}
