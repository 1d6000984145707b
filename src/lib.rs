pub mod commands;
pub mod error;
pub mod models;
pub mod modules;
pub mod store; // Quota record stores
pub mod upstream; // Generative image service

pub use commands::StudioState;
pub use error::{AppError, AppResult};
pub use modules::{GenerationSession, ResultPresenter, UserRecordMirror};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use upstream::{GeminiClient, ImageGenerator};
