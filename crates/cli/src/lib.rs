pub mod commands;
pub mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use commands::generate::GenerateArgs;
use commands::query::{QueryArgs, DEFAULT_MAX_ROWS};

#[derive(Debug, Parser)]
#[command(
    name = "schemadoc",
    about = "Postgres schema extractor",
    long_about = "Describe a Postgres database's user schemas, tables and columns as YAML, \
                  sampling the values of designated categorical columns.",
    after_help = "Examples:\n  schemadoc generate --database ecommerce --categorical products=category\n  schemadoc query --database clinica \"SELECT count(*) FROM pacientes\"\n  schemadoc doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default: schemadoc.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH", help = "Env file to load (default: .env)")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Target {
    #[arg(long, value_name = "NAME", help = "Registered database name")]
    database: Option<String>,
    #[arg(
        long,
        value_name = "URL",
        conflicts_with = "database",
        help = "Connection URL, overriding database.url"
    )]
    url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Write schema_<database>.yaml for the target database")]
    Generate {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_name = "DIR", help = "Directory for the schema file")]
        output_dir: Option<PathBuf>,
        #[arg(
            long = "categorical",
            value_name = "TABLE=COL[,COL..]",
            help = "Sample the listed columns of TABLE; repeatable, replaces configured entries"
        )]
        categorical: Vec<String>,
        #[arg(long = "limit", value_name = "N", help = "Maximum sampled values per column")]
        sample_limit: Option<u32>,
    },
    #[command(about = "Run an ad-hoc SQL statement and print the rows")]
    Query {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS, help = "Stop after this many rows")]
        max_rows: usize,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(value_name = "SQL")]
        sql: String,
    },
    #[command(about = "List registered databases with credentials masked")]
    Databases,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, output directory and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = load_dotenv(cli.env_file.as_deref()) {
        eprintln!("warning: failed to load env file: {error}");
    }

    if let Err(error) = logging::init_from_config(cli.config.as_deref()) {
        eprintln!("warning: {error:#}");
    }

    let config_path = cli.config;
    let result = match cli.command {
        Command::Generate { target, output_dir, categorical, sample_limit } => {
            commands::generate::run(GenerateArgs {
                config_path,
                database: target.database,
                url: target.url,
                output_dir,
                categorical,
                sample_limit,
            })
        }
        Command::Query { target, max_rows, json, sql } => commands::query::run(QueryArgs {
            config_path,
            database: target.database,
            url: target.url,
            max_rows,
            json,
            sql,
        }),
        Command::Databases => commands::databases::run(config_path),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config_path) }
        }
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(config_path, json),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Loads variables from `path`, or from the nearest `.env` when none is
/// given. Variables already set in the process are left alone. A missing
/// default `.env` is not an error.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match path {
        Some(path) => dotenvy::from_path(path).map(|()| Some(path.to_path_buf())),
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(error) if error.not_found() => Ok(None),
            Err(error) => Err(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn generate_accepts_repeated_categorical_flags() {
        let cli = Cli::try_parse_from([
            "schemadoc",
            "generate",
            "--database",
            "ecommerce",
            "--categorical",
            "products=category",
            "--categorical",
            "orders=status,channel",
            "--limit",
            "20",
        ])
        .expect("valid arguments");

        match cli.command {
            Command::Generate { target, categorical, sample_limit, .. } => {
                assert_eq!(target.database.as_deref(), Some("ecommerce"));
                assert_eq!(categorical, vec!["products=category", "orders=status,channel"]);
                assert_eq!(sample_limit, Some(20));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn database_and_url_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "schemadoc",
            "generate",
            "--database",
            "ecommerce",
            "--url",
            "postgres://localhost/ecommerce",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn query_defaults_max_rows_and_accepts_global_config() {
        let cli = Cli::try_parse_from(["schemadoc", "query", "SELECT 1", "--config", "alt.toml"])
            .expect("valid arguments");

        assert_eq!(cli.config.as_deref().and_then(|path| path.to_str()), Some("alt.toml"));
        assert!(cli.env_file.is_none());
        match cli.command {
            Command::Query { max_rows, json, sql, .. } => {
                assert_eq!(max_rows, 100);
                assert!(!json);
                assert_eq!(sql, "SELECT 1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
