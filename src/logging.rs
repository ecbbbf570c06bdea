//! Tracing setup for ingestion runs.
//!
//! A run reports its progress per document: which file is loading, the reference and date it
//! resolved to, how many passages were stored or dropped, and why a document was skipped. Those
//! events go to stdout in compact form and are appended to a log file so an unattended run can be
//! audited afterwards. The file is `DOCLOADER_LOG_FILE` when set, else `logs/docloader.log`.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "docloader.log";

/// Install the stdout and run-log subscribers.
///
/// `RUST_LOG` filters both sinks and defaults to `info`, which shows one line per document.
/// `debug` adds per-step OCR, re-split and collection events; per-call throttle waits are
/// `trace`. When the log file cannot be opened the run continues with stdout only.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let path = log_file_path(std::env::var("DOCLOADER_LOG_FILE").ok());
    if let Some(writer) = open_run_log(&path) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Run log location: the configured path, or `logs/docloader.log` when unset or blank.
fn log_file_path(configured: Option<String>) -> PathBuf {
    match configured {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => Path::new(LOG_DIR).join(LOG_FILE_NAME),
    }
}

/// Open `path` for appending, creating its directory first. The writer guard lives for the
/// rest of the process so buffered lines are flushed on exit.
fn open_run_log(path: &Path) -> Option<NonBlocking> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(dir)
    {
        eprintln!("Failed to create log directory {}: {err}", dir.display());
        return None;
    }
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
