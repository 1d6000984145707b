pub mod config;
pub mod generation;
pub mod preset;
pub mod quota;

pub use config::{AppConfig, UpstreamProxyConfig};
pub use generation::{ContentPart, GeneratedImage, GenerationRequest};
pub use preset::{LocalizedLabel, Preset, PresetCategory};
pub use quota::{QuotaPatch, QuotaPolicy, UserQuotaRecord};
