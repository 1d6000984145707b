// Upstream module - generative image service
use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::ContentPart;

pub mod client;
pub mod mapper;

pub use client::GeminiClient;

/// Opaque text-to-image call: one prompt in, content parts out
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Whether an API credential is configured. Checked before any call.
    fn has_credential(&self) -> bool;

    async fn generate(&self, prompt: &str, model: &str) -> AppResult<Vec<ContentPart>>;
}
