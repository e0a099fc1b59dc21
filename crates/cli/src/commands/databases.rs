use std::path::PathBuf;

use schemadoc_core::config::ConfigOverrides;
use schemadoc_core::registry::redact_url;
use secrecy::ExposeSecret;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "databases";

/// Lists the registry's named databases with credentials masked.
pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };
    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    if registry.is_empty() {
        return CommandResult::success(
            COMMAND,
            "no databases registered; set registry.base_url with registry.names, or registry.urls",
        );
    }

    let mut lines = vec![format!("{} registered database(s):", registry.iter().count())];
    lines.extend(
        registry.iter().map(|(name, url)| format!("- {name} = {}", redact_url(url.expose_secret()))),
    );
    CommandResult::success(COMMAND, lines.join("\n"))
}
