use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppResult;

pub fn get_log_dir(data_dir: &Path) -> AppResult<PathBuf> {
    let log_dir = data_dir.join("logs");

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    Ok(log_dir)
}

/// Initialize logger system (console + daily rolling file under `data_dir/logs`)
pub fn init_logger(data_dir: &Path) {
    // Capture `log` records from dependencies
    let _ = tracing_log::LogTracer::init();

    let log_dir = match get_log_dir(data_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to initialize log directory: {}", e);
            return;
        }
    };

    let file_appender = tracing_appender::rolling::daily(log_dir, "studio.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    // No ANSI escapes in the file
    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init: a second call (tests, re-entry) must not panic
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    // The guard must outlive every log call until process exit
    std::mem::forget(guard);

    info!("Logger system initialized (Console + File Persistence)");
}

/// Truncate log files in place so open handles stay valid
pub fn clear_logs(data_dir: &Path) -> AppResult<()> {
    let log_dir = get_log_dir(data_dir)?;
    for entry in fs::read_dir(&log_dir)?.flatten() {
        let path = entry.path();
        if path.is_file() {
            fs::OpenOptions::new().write(true).truncate(true).open(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_logs_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = get_log_dir(dir.path()).unwrap();
        let log_file = log_dir.join("studio.log.2024-03-01");
        fs::write(&log_file, "old line\n").unwrap();

        clear_logs(dir.path()).unwrap();
        assert!(log_file.exists());
        assert_eq!(fs::read_to_string(&log_file).unwrap(), "");
    }
}
