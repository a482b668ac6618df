use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "info";

/// Keeps the background log writer alive; dropping it flushes the file.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Per-participant log file next to the results, plus warnings on stderr.
/// `RUST_LOG` overrides the default `info` filter for the file.
pub fn init_tracing(dir: &Path, participant_id: &str) -> Result<LoggingGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create results directory {}", dir.display()))?;

    let file_name = log_file_name(participant_id);
    let appender = rolling::never(dir, &file_name);
    let (non_blocking_writer, worker_guard) = tracing_appender::non_blocking(appender);
    let env_filter = build_env_filter(std::env::var("RUST_LOG").ok().as_deref())?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let path = dir.join(file_name);
    tracing::info!(
        target: "logging",
        path = %path.display(),
        participant = participant_id,
        "logging_initialized"
    );

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        path,
    })
}

fn log_file_name(participant_id: &str) -> String {
    format!("{participant_id}.log")
}

fn build_env_filter(filter: Option<&str>) -> Result<EnvFilter> {
    let filter = filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse log filter '{filter}'"))
}
