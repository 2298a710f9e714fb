use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs a file-backed subscriber. The terminal belongs to the UI, so
/// without a log file nothing is installed and events are dropped.
///
/// Keep the returned guard alive until exit; dropping it flushes the writer.
pub fn init(cfg: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(None);
    };
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .context("logging: log file has no file name")?;
    fs::create_dir_all(dir)
        .with_context(|| format!("logging: failed to create directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&cfg.filter))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("logging: failed to install subscriber: {err}"))?;

    Ok(Some(guard))
}

/// `RUST_LOG` wins over the configured directive; anything unparsable falls
/// back to `info`.
fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
