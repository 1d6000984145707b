use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

const DATA_DIR: &str = ".preset_studio";
const CONFIG_FILE: &str = "studio_config.json";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Get data directory path, creating it on first use
pub fn get_data_dir() -> AppResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Configuration("Failed to get user home directory".into()))?;
    let data_dir = home.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

/// Load application config from the default data directory
pub fn load_app_config() -> AppResult<AppConfig> {
    load_app_config_from(&get_data_dir()?)
}

/// Load application config from `data_dir`, falling back to defaults.
/// The API key always comes from the environment.
pub fn load_app_config_from(data_dir: &Path) -> AppResult<AppConfig> {
    let config_path = data_dir.join(CONFIG_FILE);

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content)?
    } else {
        AppConfig::new()
    };

    config.api_key = read_api_key();
    if !config.has_api_key() {
        tracing::warn!("{} is not set, generation is disabled", API_KEY_ENV);
    }
    Ok(config)
}

/// Save application config
pub fn save_app_config(config: &AppConfig) -> AppResult<()> {
    save_app_config_to(&get_data_dir()?, config)
}

pub fn save_app_config_to(data_dir: &Path, config: &AppConfig) -> AppResult<()> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(data_dir.join(CONFIG_FILE), content)?;
    Ok(())
}

fn read_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
