//! Diagnostic logging
//!
//! Tracing output goes to a daily-rotated file under the platform data
//! directory (`XDG_DATA_HOME/casechat/logs` on Linux). The terminal is left to
//! the chat UI, so only warnings and errors are mirrored to stderr.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

use crate::error::{ChatError, Result};

static TRACING_GUARDS: OnceCell<Mutex<Option<(WorkerGuard, WorkerGuard)>>> = OnceCell::new();

/// Install the global subscriber. `level` is used when `RUST_LOG` is unset.
/// Calling this more than once is a no-op.
pub fn init_logging(logs_dir: &Path, level: &str) -> Result<()> {
    if TRACING_GUARDS.get().is_some() {
        return Ok(());
    }
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("casechat")
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|e| ChatError::LoggingSetup(e.to_string()))?;

    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    let file_layer = Layer::new()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = Layer::new()
        .with_writer(non_blocking_stderr)
        .with_ansi(true)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    Registry::default()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ChatError::LoggingSetup(e.to_string()))?;

    TRACING_GUARDS
        .set(Mutex::new(Some((file_guard, stderr_guard))))
        .ok();
    Ok(())
}

/// Flush buffered log lines. Call before the process exits.
pub fn flush_logging() {
    if let Some(guards) = TRACING_GUARDS.get() {
        if let Ok(mut guards) = guards.lock() {
            guards.take();
        }
    }
}

/// Get the platform-specific log directory using XDG conventions
pub fn log_directory() -> Result<PathBuf> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| ChatError::LoggingSetup("Failed to determine home directory".into()))?;

    // Use XDG_DATA_HOME on Linux, equivalent on other platforms
    Ok(base.data_dir().join("casechat").join("logs"))
}
