use std::{fs::create_dir_all, io, path::Path};

use thiserror::Error;
use tracing::{
    subscriber::{set_global_default, SetGlobalDefaultError},
    Level,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, registry};

pub static LOG_FILE_PREFIX: &str = "cline-repair-";

/// Create and set the global loggers.
///
/// Every event goes to `<log_dir>/cline-repair-<token>.log`. Colored output on
/// stderr is added only when `console` is set, so JSON mode keeps stdout and
/// stderr free of log lines. The returned guards flush the writers on drop.
pub fn init_logger(
    log_dir: &Path,
    token: &str,
    verbose: bool,
    console: bool,
) -> Result<Vec<WorkerGuard>, LoggerError> {
    create_dir_all(log_dir).map_err(LoggerError::CreateDirectory)?;

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = tracing_subscriber::filter::Targets::new().with_default(level);

    // File layer
    let (file_guard, file_layer) = {
        let appender = RollingFileAppender::builder()
            .filename_prefix(format!("{LOG_FILE_PREFIX}{token}"))
            .filename_suffix("log")
            .rotation(Rotation::NEVER)
            .build(log_dir)?;

        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);

        (guard, layer)
    };

    // Std layer
    let (std_guard, std_layer) = if console {
        let (writer, guard) = tracing_appender::non_blocking(io::stderr());

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(true)
            .with_target(false);

        (Some(guard), Some(layer))
    } else {
        (None, None)
    };

    let registry = registry().with(file_layer).with(std_layer).with(filter);

    set_global_default(registry)?;

    Ok(std::iter::once(file_guard).chain(std_guard).collect())
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to create log file appender:\n{0}")]
    CreateRollingAppender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to create log directory:\n{0}")]
    CreateDirectory(#[source] io::Error),

    #[error("Failed to install global logger:\n{0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),
}
