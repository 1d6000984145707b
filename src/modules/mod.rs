pub mod config;
pub mod logger;
pub mod mirror;
pub mod presenter;
pub mod presets;
pub mod prompt;
pub mod session;

pub use mirror::UserRecordMirror;
pub use presenter::ResultPresenter;
pub use session::{
    FailureKind, GenerationSession, SessionSettings, SessionSnapshot, SessionState,
    SubmitOutcome, UsageWrite,
};
