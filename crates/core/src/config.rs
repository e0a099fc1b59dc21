use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::categorical::CategoricalConfig;
use crate::extractor::{ExtractionSettings, DEFAULT_SAMPLE_LIMIT};
use crate::registry::DatabaseRegistry;

pub const DEFAULT_CONFIG_FILE: &str = "schemadoc.toml";
pub const NESTED_CONFIG_FILE: &str = "config/schemadoc.toml";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub registry: RegistryConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub connect_timeout_secs: u64,
}

/// Named databases reachable from this configuration.
///
/// `base_url` + `names` expands to `<base_url>/<name>` for each name; `urls`
/// adds explicit entries which win over expanded ones.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    pub base_url: Option<SecretString>,
    pub names: Vec<String>,
    pub urls: IndexMap<String, SecretString>,
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub sample_limit: u32,
    pub output_dir: PathBuf,
    pub categorical: CategoricalConfig,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub sample_limit: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub categorical: Option<CategoricalConfig>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("database `{name}` not found; choose one of: {}", known.join(", "))]
    UnknownDatabase { name: String, known: Vec<String> },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: secret_value("postgres://localhost:5432/postgres".to_string()),
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            registry: RegistryConfig::default(),
            extraction: ExtractionConfig {
                sample_limit: DEFAULT_SAMPLE_LIMIT,
                output_dir: PathBuf::from("schemas"),
                categorical: CategoricalConfig::default(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Builds the explicit registry of named databases.
    pub fn registry(&self) -> Result<DatabaseRegistry, ConfigError> {
        let mut registry = match &self.registry.base_url {
            Some(base_url) => DatabaseRegistry::from_base(
                base_url.expose_secret(),
                self.registry.names.iter().map(String::as_str),
            )?,
            None => DatabaseRegistry::default(),
        };
        for (name, url) in &self.registry.urls {
            registry.insert(name, url.expose_secret())?;
        }
        Ok(registry)
    }

    /// Resolves the URL to connect to: a registry entry when `name` is given,
    /// otherwise `database.url`.
    pub fn database_url(&self, name: Option<&str>) -> Result<SecretString, ConfigError> {
        match name {
            Some(name) => self.registry()?.get(name).cloned(),
            None => Ok(self.database.url.clone()),
        }
    }

    pub fn extraction_settings(&self) -> Result<ExtractionSettings, ConfigError> {
        ExtractionSettings::new(
            self.extraction.categorical.clone(),
            self.extraction.sample_limit,
            self.extraction.output_dir.clone(),
        )
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = secret_value(url);
            }
            if let Some(connect_timeout_secs) = database.connect_timeout_secs {
                self.database.connect_timeout_secs = connect_timeout_secs;
            }
        }

        if let Some(registry) = patch.registry {
            if let Some(base_url) = registry.base_url {
                self.registry.base_url = Some(secret_value(base_url));
            }
            if let Some(names) = registry.names {
                self.registry.names = names;
            }
            if let Some(urls) = registry.urls {
                self.registry.urls =
                    urls.into_iter().map(|(name, url)| (name, secret_value(url))).collect();
            }
        }

        if let Some(extraction) = patch.extraction {
            if let Some(sample_limit) = extraction.sample_limit {
                self.extraction.sample_limit = sample_limit;
            }
            if let Some(output_dir) = extraction.output_dir {
                self.extraction.output_dir = output_dir;
            }
            if let Some(categorical) = extraction.categorical {
                self.extraction.categorical = CategoricalConfig::from_entries(categorical)?;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCHEMADOC_DATABASE_URL") {
            self.database.url = secret_value(value);
        }
        if let Some(value) = read_env("SCHEMADOC_DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs =
                parse_u64("SCHEMADOC_DATABASE_CONNECT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SCHEMADOC_REGISTRY_BASE_URL") {
            self.registry.base_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("SCHEMADOC_REGISTRY_NAMES") {
            self.registry.names = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("SCHEMADOC_SAMPLE_LIMIT") {
            self.extraction.sample_limit = parse_u32("SCHEMADOC_SAMPLE_LIMIT", &value)?;
        }
        if let Some(value) = read_env("SCHEMADOC_OUTPUT_DIR") {
            self.extraction.output_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("SCHEMADOC_LOGGING_LEVEL").or_else(|| read_env("SCHEMADOC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SCHEMADOC_LOGGING_FORMAT").or_else(|| read_env("SCHEMADOC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = secret_value(database_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(sample_limit) = overrides.sample_limit {
            self.extraction.sample_limit = sample_limit;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.extraction.output_dir = output_dir;
        }
        if let Some(categorical) = overrides.categorical {
            self.extraction.categorical = categorical;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_registry(&self.registry)?;
        validate_extraction(&self.extraction)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

pub fn is_postgres_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("postgres://") || url.starts_with("postgresql://")
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if !is_postgres_url(database.url.expose_secret()) {
        return Err(ConfigError::Validation(
            "database.url must be a postgres URL (`postgres://...` or `postgresql://...`)"
                .to_string(),
        ));
    }

    if database.connect_timeout_secs == 0 || database.connect_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.connect_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_registry(registry: &RegistryConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &registry.base_url {
        if !is_postgres_url(base_url.expose_secret()) {
            return Err(ConfigError::Validation(
                "registry.base_url must be a postgres URL (`postgres://...` or `postgresql://...`)"
                    .to_string(),
            ));
        }
    } else if !registry.names.is_empty() {
        return Err(ConfigError::Validation(
            "registry.names is set but registry.base_url is missing".to_string(),
        ));
    }

    for (name, url) in &registry.urls {
        if !is_postgres_url(url.expose_secret()) {
            return Err(ConfigError::Validation(format!(
                "registry.urls.{name} must be a postgres URL"
            )));
        }
    }

    Ok(())
}

fn validate_extraction(extraction: &ExtractionConfig) -> Result<(), ConfigError> {
    ExtractionSettings::new(
        extraction.categorical.clone(),
        extraction.sample_limit,
        extraction.output_dir.clone(),
    )
    .map(|_| ())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    registry: Option<RegistryPatch>,
    extraction: Option<ExtractionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryPatch {
    base_url: Option<String>,
    names: Option<Vec<String>>,
    urls: Option<IndexMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionPatch {
    sample_limit: Option<u32>,
    output_dir: Option<PathBuf>,
    categorical: Option<IndexMap<String, Vec<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
