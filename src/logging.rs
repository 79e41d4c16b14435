//! Tracing setup.
//!
//! The terminal belongs to the ui, so all log output goes to a file
//! (`--log-file`, default `crv.log` in the temp directory). Filtering
//! follows `RUST_LOG`, e.g. `RUST_LOG=crv::view=trace`, and defaults to `info`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::{TVConfig, TVError};

/// Install the global subscriber and return the log file path.
pub fn init(config: &TVConfig) -> Result<PathBuf, TVError> {
    let path = config.log_path();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| TVError::Logging(e.to_string()))?;
    Ok(path)
}
