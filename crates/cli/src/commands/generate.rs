use std::path::PathBuf;

use schemadoc_core::categorical::CategoricalConfig;
use schemadoc_core::config::{ConfigError, ConfigOverrides};
use schemadoc_core::extractor;
use schemadoc_db::PgConnector;

use crate::commands::{load_config, runtime, CommandResult};

const COMMAND: &str = "generate";

#[derive(Debug, Clone, Default)]
pub struct GenerateArgs {
    pub config_path: Option<PathBuf>,
    pub database: Option<String>,
    pub url: Option<String>,
    pub output_dir: Option<PathBuf>,
    /// `table=col_a,col_b` entries; when present they replace the configured set.
    pub categorical: Vec<String>,
    pub sample_limit: Option<u32>,
}

pub fn run(args: GenerateArgs) -> CommandResult {
    let categorical = match parse_categorical(&args.categorical) {
        Ok(categorical) => categorical,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let overrides = ConfigOverrides {
        database_url: args.url,
        sample_limit: args.sample_limit,
        output_dir: args.output_dir,
        categorical,
        ..ConfigOverrides::default()
    };
    let config = match load_config(args.config_path, overrides) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let resolved = config
        .database_url(args.database.as_deref())
        .and_then(|url| config.extraction_settings().map(|settings| (url, settings)));
    let (url, settings) = match resolved {
        Ok(resolved) => resolved,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let connector = PgConnector::new(url).with_timeout_secs(config.database.connect_timeout_secs);
    match runtime.block_on(extractor::run(&connector, settings)) {
        Ok(report) => {
            let mut message = format!(
                "wrote {} ({} schemas, {} tables, {} columns, {} sampled)",
                report.output_path.display(),
                report.schema_count,
                report.table_count,
                report.column_count,
                report.sampled_columns,
            );
            for warning in &report.warnings {
                message.push_str("\nwarning: ");
                message.push_str(&warning.to_string());
            }
            CommandResult::success(COMMAND, message)
        }
        Err(error) => {
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), error.exit_code())
        }
    }
}

fn parse_categorical(specs: &[String]) -> Result<Option<CategoricalConfig>, ConfigError> {
    if specs.is_empty() {
        return Ok(None);
    }

    let entries = specs
        .iter()
        .map(|spec| CategoricalConfig::parse_spec(spec))
        .collect::<Result<Vec<_>, _>>()?;
    CategoricalConfig::from_entries(entries).map(Some)
}
