use chrono::{DateTime, Utc};
use serde::Serialize;

/// One generation attempt, alive only while the call is in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub id: String,
    pub prompt: String,
    pub preset_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(prompt: String, preset_id: Option<String>) -> Self {
        Self {
            id: format!("gen-{}", uuid::Uuid::new_v4().simple()),
            prompt,
            preset_id,
            created_at: Utc::now(),
        }
    }
}

/// A piece of a generateContent response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// Decoded image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl GeneratedImage {
    pub fn is_png(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("image/png")
    }
}
