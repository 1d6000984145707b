use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub language: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Record id exempt from the daily quota
    #[serde(default)]
    pub admin_user_id: Option<String>,
    pub default_export_path: Option<String>,
    /// Generation request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
    /// Never persisted, read from the environment at start-up
    #[serde(skip)]
    pub api_key: Option<String>,
}

/// Upstream proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    /// Proxy address (http://, https://, socks5://)
    pub url: String,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            language: "vi".to_string(),
            model: default_model(),
            admin_user_id: None,
            default_export_path: None,
            request_timeout: default_request_timeout(),
            upstream_proxy: UpstreamProxyConfig::default(),
            api_key: None,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout() -> u64 {
    120 // image models are slow, 60s cuts off large renders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"language":"en","default_export_path":null}"#).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, 120);
        assert!(config.admin_user_id.is_none());
        assert!(!config.upstream_proxy.enabled);
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = AppConfig::new();
        config.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(config.has_api_key());

        config.api_key = Some("   ".to_string());
        assert!(!config.has_api_key());
    }
}
