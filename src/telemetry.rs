//! Log output setup.
//!
//! Console output goes to stderr so command output on stdout stays
//! machine-readable. An optional log file receives the same events without
//! ANSI colouring. `RUST_LOG` overrides the configured level.

use crate::error::{MeasursError, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter directive, e.g. `info` or `measurs=debug`
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(options: &LogOptions) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| MeasursError::InvalidConfig(format!("log level: {}", e)))?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = match &options.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| MeasursError::InvalidConfig(format!("logging: {}", e)))
}
