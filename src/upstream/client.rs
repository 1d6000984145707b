// Gemini generateContent client
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tokio::time::Duration;

use super::{mapper, ImageGenerator};
use crate::error::{AppError, AppResult};
use crate::models::{AppConfig, ContentPart};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.request_timeout));

        let proxy = &config.upstream_proxy;
        if proxy.enabled && !proxy.url.is_empty() {
            match reqwest::Proxy::all(&proxy.url) {
                Ok(p) => {
                    builder = builder.proxy(p);
                    tracing::info!("GeminiClient enabled proxy: {}", proxy.url);
                }
                Err(e) => tracing::error!("Invalid proxy address {}: {}", proxy.url, e),
            }
        }

        let http_client = builder.build().unwrap_or_else(|e| {
            tracing::error!("Failed to build HTTP client, using defaults: {}", e);
            Client::new()
        });
        Self::with_http_client(http_client, config.api_key.clone())
    }

    pub fn with_http_client(http_client: Client, api_key: Option<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_url(base_url: &str, model: &str) -> String {
        format!("{}/models/{}:generateContent", base_url, model)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, model: &str) -> AppResult<Vec<ContentPart>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("API key is not configured".to_string()))?;
        let url = Self::build_url(&self.base_url, model);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            API_KEY_HEADER,
            header::HeaderValue::from_str(api_key)
                .map_err(|e| AppError::Configuration(format!("Invalid API key: {}", e)))?,
        );

        tracing::info!("Sending generateContent to model {}", model);
        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(&mapper::build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini upstream error {}: {}", status, text);
            return Err(AppError::ExternalCall(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::ExternalCall(format!("Parse json failed: {}", e)))?;
        mapper::parse_parts(&json)
    }
}
