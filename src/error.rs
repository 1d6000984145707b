use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Daily quota reached ({usage_count}/{daily_quota}), try again tomorrow")]
    QuotaExceeded { usage_count: u32, daily_quota: u32 },

    #[error("Prompt is empty, pick a preset or describe the image")]
    EmptyPrompt,

    #[error("Generation failed: {0}")]
    ExternalCall(String),

    #[error("No image produced, try rephrasing the prompt")]
    NoImageProduced,

    #[error("Failed to record usage: {0}")]
    QuotaWrite(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

// Serialize as the display string so front-ends get a ready message
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type AppResult<T> = Result<T, AppError>;
