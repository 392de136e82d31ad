// src/logging.rs
//! Tracing setup: `RUST_LOG` filter (default `flight_price_alert=info,warn`),
//! compact or JSON (`LOG_FORMAT=json`) lines on stdout, plus an optional
//! plain-text copy appended to `LOG_FILE`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "flight_price_alert=info,warn";
pub const ENV_LOG_FILE: &str = "LOG_FILE";

/// Open `path` for appending, creating it and its parent directory if needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Call once, from `main`.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let log_path = std::env::var(ENV_LOG_FILE).ok().filter(|p| !p.trim().is_empty());
    let mut file_error = None;
    let file = log_path.as_deref().and_then(|p| match open_log_file(Path::new(p)) {
        Ok(f) => Some(f),
        Err(e) => {
            file_error = Some(e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .with(file.map(|f| fmt::layer().with_ansi(false).with_writer(Mutex::new(f))))
        .init();

    if let (Some(path), Some(e)) = (log_path, file_error) {
        tracing::warn!(%path, error = %e, "log file unavailable, logging to stdout only");
    }
}
