use std::path::Path;

use anyhow::{anyhow, Context, Result};
use schemadoc_core::config::{AppConfig, ConfigOverrides, LogFormat, LoggingConfig};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::commands::load_config;

/// Installs the global subscriber on stderr, leaving stdout to command output.
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!(error)).context("failed to install log subscriber")
}

/// Logging settings for the process. A configuration that does not load
/// falls back to defaults here; the command itself reports the failure.
pub fn init_from_config(config_path: Option<&Path>) -> Result<()> {
    let logging = load_config(config_path.map(Path::to_path_buf), ConfigOverrides::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init(&logging)
}
