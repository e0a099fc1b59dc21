use std::path::PathBuf;

use schemadoc_core::catalog::{Catalog, Connector};
use schemadoc_core::config::ConfigOverrides;
use schemadoc_core::errors::ExtractError;
use schemadoc_db::{PgConnector, QueryResult};
use serde_json::Value;

use crate::commands::{load_config, runtime, CommandResult};

const COMMAND: &str = "query";
pub const DEFAULT_MAX_ROWS: usize = 100;

#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub config_path: Option<PathBuf>,
    pub database: Option<String>,
    pub url: Option<String>,
    pub max_rows: usize,
    pub json: bool,
    pub sql: String,
}

pub fn run(args: QueryArgs) -> CommandResult {
    let overrides = ConfigOverrides { database_url: args.url, ..ConfigOverrides::default() };
    let config = match load_config(args.config_path, overrides) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let url = match config.database_url(args.database.as_deref()) {
        Ok(url) => url,
        Err(error) => return CommandResult::config_failure(COMMAND, &error),
    };

    let runtime = match runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let connector = PgConnector::new(url).with_timeout_secs(config.database.connect_timeout_secs);
    let outcome = runtime.block_on(async {
        let mut catalog = connector.connect().await.map_err(ExtractError::connection)?;
        let result = catalog.run_query(&args.sql, args.max_rows).await;
        if let Err(error) = catalog.close().await {
            tracing::warn!(
                event_name = "query.disconnect.failed",
                error = %error,
                "error while releasing connection"
            );
        }
        result.map_err(ExtractError::from)
    });

    match outcome {
        Ok(result) if args.json => match serde_json::to_string_pretty(&result) {
            Ok(output) => CommandResult::raw(output),
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 5),
        },
        Ok(result) => CommandResult::raw(render_table(&result)),
        Err(error) => {
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), error.exit_code())
        }
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Pipe-separated rows under a header, padded to the widest cell per column.
pub fn render_table(result: &QueryResult) -> String {
    let cells: Vec<Vec<String>> =
        result.rows.iter().map(|row| row.iter().map(render_cell).collect()).collect();

    let mut widths: Vec<usize> =
        result.columns.iter().map(|column| column.chars().count()).collect();
    for row in &cells {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |row: &[String]| {
        row.iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(result.columns.as_slice())];
    lines.push(widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().join("-+-"));
    lines.extend(cells.iter().map(|row| format_row(row.as_slice())));

    let noun = if result.rows.len() == 1 { "row" } else { "rows" };
    let mut footer = format!("({} {noun})", result.rows.len());
    if result.truncated {
        footer.push_str(" truncated; raise --max-rows to see more");
    }
    lines.push(footer);
    lines.join("\n")
}
