use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use schemadoc_core::config::{resolve_config_path, AppConfig, ConfigOverrides};
use schemadoc_core::registry::redact_url;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::load_config;

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match load_config(config_path.clone(), ConfigOverrides::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = resolve_config_path(config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let sources = Sources { file_doc: file_doc.as_ref(), file_path: file_path.as_deref() };

    render(&config, &sources)
}

struct Sources<'a> {
    file_doc: Option<&'a Value>,
    file_path: Option<&'a Path>,
}

fn render(config: &AppConfig, sources: &Sources<'_>) -> String {
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "database.url",
        &redact_url(config.database.url.expose_secret()),
        &["SCHEMADOC_DATABASE_URL"],
    ));
    lines.push(sources.line(
        "database.connect_timeout_secs",
        &config.database.connect_timeout_secs.to_string(),
        &["SCHEMADOC_DATABASE_CONNECT_TIMEOUT_SECS"],
    ));

    let base_url = config
        .registry
        .base_url
        .as_ref()
        .map(|url| redact_url(url.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    lines.push(sources.line("registry.base_url", &base_url, &["SCHEMADOC_REGISTRY_BASE_URL"]));
    lines.push(sources.line(
        "registry.names",
        &format!("[{}]", config.registry.names.join(", ")),
        &["SCHEMADOC_REGISTRY_NAMES"],
    ));
    lines.push(sources.line(
        "registry.urls",
        &format!("{} explicit entries", config.registry.urls.len()),
        &[],
    ));

    lines.push(sources.line(
        "extraction.sample_limit",
        &config.extraction.sample_limit.to_string(),
        &["SCHEMADOC_SAMPLE_LIMIT"],
    ));
    lines.push(sources.line(
        "extraction.output_dir",
        &config.extraction.output_dir.display().to_string(),
        &["SCHEMADOC_OUTPUT_DIR"],
    ));
    let categorical: Vec<String> = config
        .extraction
        .categorical
        .tables()
        .map(|(table, columns)| format!("{table}={}", columns.join(",")))
        .collect();
    let categorical =
        if categorical.is_empty() { "<none>".to_string() } else { categorical.join("; ") };
    lines.push(sources.line("extraction.categorical", &categorical, &[]));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["SCHEMADOC_LOGGING_LEVEL", "SCHEMADOC_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["SCHEMADOC_LOGGING_FORMAT", "SCHEMADOC_LOG_FORMAT"],
    ));

    lines.join("\n")
}

impl Sources<'_> {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

/// Blank values are ignored by config loading, so they are not a source either.
fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: toml::Value = "[extraction]\nsample_limit = 10\n".parse().expect("toml");
        assert!(contains_path(&doc, "extraction.sample_limit"));
        assert!(!contains_path(&doc, "extraction.output_dir"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}
