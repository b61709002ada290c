//! Process-wide log setup driven by [`LogConfig`]

use crate::config::{ConfigError, ConfigResult, LogConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Output goes to the file
/// named by `config.output` (appended, no ANSI colors) or to stderr.
/// Returns `Ok(false)` if a global subscriber was already installed, in
/// which case nothing changes.
pub fn init(config: &LogConfig) -> ConfigResult<bool> {
    config.validate("log")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));

    let installed = match &config.output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::IoError {
                    path: path.clone(),
                    source: e,
                })?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}
