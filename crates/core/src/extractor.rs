//! Schema extraction: catalog metadata in, schema file out.
//!
//! [`SchemaExtractor`] owns one connection for its whole life. [`run`] is the
//! scoped entry point: connect, generate, disconnect, with the disconnect
//! performed on every path once a connection exists.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, Connector, SampleRequest};
use crate::categorical::CategoricalConfig;
use crate::config::ConfigError;
use crate::errors::{ExtractError, ExtractionWarning};
use crate::output;
use crate::schema::{ColumnDescriptor, SampledValue, SchemaDescriptor, SchemaDocument};

pub const DEFAULT_SAMPLE_LIMIT: u32 = 50;
pub const MAX_SAMPLE_LIMIT: u32 = 10_000;

#[derive(Clone, Debug)]
pub struct ExtractionSettings {
    categorical: CategoricalConfig,
    sample_limit: u32,
    output_dir: PathBuf,
}

impl ExtractionSettings {
    pub fn new(
        categorical: CategoricalConfig,
        sample_limit: u32,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if sample_limit == 0 || sample_limit > MAX_SAMPLE_LIMIT {
            return Err(ConfigError::Validation(format!(
                "extraction.sample_limit must be in range 1..={MAX_SAMPLE_LIMIT}"
            )));
        }

        let output_dir = output_dir.into();
        if output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "extraction.output_dir must not be empty".to_string(),
            ));
        }

        Ok(Self { categorical, sample_limit, output_dir })
    }

    pub fn categorical(&self) -> &CategoricalConfig {
        &self.categorical
    }

    pub fn sample_limit(&self) -> u32 {
        self.sample_limit
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Summary of a completed extraction.
#[derive(Clone, Debug, Serialize)]
pub struct ExtractionReport {
    pub database_name: String,
    pub output_path: PathBuf,
    pub schema_count: usize,
    pub table_count: usize,
    pub column_count: usize,
    pub sampled_columns: usize,
    pub warnings: Vec<ExtractionWarning>,
}

pub struct SchemaExtractor<C> {
    catalog: C,
    settings: ExtractionSettings,
    run_id: Uuid,
    warnings: Vec<ExtractionWarning>,
}

impl<C: Catalog> SchemaExtractor<C> {
    pub fn new(catalog: C, settings: ExtractionSettings) -> Self {
        Self::with_run_id(catalog, settings, Uuid::new_v4())
    }

    pub fn with_run_id(catalog: C, settings: ExtractionSettings, run_id: Uuid) -> Self {
        Self { catalog, settings, run_id, warnings: Vec::new() }
    }

    /// Warnings recorded since the last listing started.
    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    /// Describes every user column, sampling the categorical ones.
    pub async fn list_tables_and_columns(&mut self) -> Result<SchemaDescriptor, ExtractError> {
        self.warnings.clear();
        let limit = self.settings.sample_limit;
        let columns = self.catalog.list_columns().await?;

        let mut descriptor = SchemaDescriptor::default();
        for column in columns {
            let mut entry =
                ColumnDescriptor::new(&column.column_name, &column.data_type, column.is_nullable);

            if self.settings.categorical.is_categorical(&column.table_name, &column.column_name) {
                entry.possible_values = self
                    .sample_column(
                        &column.table_schema,
                        &column.table_name,
                        &column.column_name,
                        limit,
                    )
                    .await?;
            }

            descriptor.push_column(&column.table_schema, &column.table_name, entry);
        }

        Ok(descriptor)
    }

    /// Up to `limit` non-null values of `column` paired with their row's
    /// primary key, in key order. Tables without a single-column primary key
    /// yield no values and a recorded warning.
    pub async fn get_distinct_values(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        limit: u32,
    ) -> Result<Vec<SampledValue>, ExtractError> {
        Ok(self.sample_column(schema, table, column, limit).await?.unwrap_or_default())
    }

    /// The table's primary-key column, when the key has exactly one column.
    pub async fn get_primary_key(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Option<String>, ExtractError> {
        let mut key_columns = self.catalog.primary_key_columns(schema, table).await?;
        if key_columns.len() == 1 {
            Ok(key_columns.pop())
        } else {
            Ok(None)
        }
    }

    /// Writes `schema_<database>.yaml` for the connected database.
    pub async fn generate_schema_file(&mut self) -> Result<ExtractionReport, ExtractError> {
        let database_name = self.catalog.current_database().await?;
        info!(
            event_name = "extract.generate.database_resolved",
            run_id = %self.run_id,
            database = %database_name,
            "resolved current database"
        );

        let tables = self.list_tables_and_columns().await?;
        let report_counts = (
            tables.schema_count(),
            tables.table_count(),
            tables.column_count(),
            count_sampled(&tables),
        );

        let document = SchemaDocument::new(tables);
        let output_path =
            output::write_schema_file(self.settings.output_dir(), &database_name, &document)?;
        info!(
            event_name = "extract.generate.written",
            run_id = %self.run_id,
            path = %output_path.display(),
            "schema file written"
        );

        let (schema_count, table_count, column_count, sampled_columns) = report_counts;
        Ok(ExtractionReport {
            database_name,
            output_path,
            schema_count,
            table_count,
            column_count,
            sampled_columns,
            warnings: self.warnings.clone(),
        })
    }

    pub async fn disconnect(&mut self) -> Result<(), ExtractError> {
        self.catalog.close().await.map_err(ExtractError::from)
    }

    async fn sample_column(
        &mut self,
        schema: &str,
        table: &str,
        column: &str,
        limit: u32,
    ) -> Result<Option<Vec<SampledValue>>, ExtractError> {
        let key_columns = self.catalog.primary_key_columns(schema, table).await?;
        let [primary_key] = key_columns.as_slice() else {
            let warning = ExtractionWarning::MissingPrimaryKey {
                schema: schema.to_string(),
                table: table.to_string(),
                column: column.to_string(),
                key_columns: key_columns.len(),
            };
            warn!(
                event_name = "extract.sample.skipped",
                run_id = %self.run_id,
                schema,
                table,
                column,
                key_columns = key_columns.len(),
                "{warning}"
            );
            self.warnings.push(warning);
            return Ok(None);
        };

        let request = SampleRequest { schema, table, column, primary_key, limit };
        let values = self.catalog.sample_values(&request).await?;
        Ok(Some(values))
    }
}

fn count_sampled(descriptor: &SchemaDescriptor) -> usize {
    descriptor
        .schemas()
        .flat_map(|(_, tables)| tables.values())
        .flatten()
        .filter(|column| column.possible_values.is_some())
        .count()
}

/// Connects, generates the schema file and disconnects.
///
/// Failures are logged here and handed back; the connection, once acquired,
/// is released whether or not generation succeeded.
pub async fn run<K: Connector>(
    connector: &K,
    settings: ExtractionSettings,
) -> Result<ExtractionReport, ExtractError> {
    let run_id = Uuid::new_v4();

    info!(
        event_name = "extract.connect.start",
        run_id = %run_id,
        target = %connector.target(),
        "connecting to database"
    );
    let catalog = match connector.connect().await {
        Ok(catalog) => catalog,
        Err(source) => {
            let error = ExtractError::connection(source);
            error!(
                event_name = "extract.connect.failed",
                run_id = %run_id,
                error = %error,
                "could not connect; no schema file written"
            );
            return Err(error);
        }
    };

    let mut extractor = SchemaExtractor::with_run_id(catalog, settings, run_id);
    info!(event_name = "extract.generate.start", run_id = %run_id, "generating schema file");
    let outcome = extractor.generate_schema_file().await;

    info!(event_name = "extract.disconnect", run_id = %run_id, "disconnecting from database");
    if let Err(error) = extractor.disconnect().await {
        warn!(
            event_name = "extract.disconnect.failed",
            run_id = %run_id,
            error = %error,
            "error while releasing connection"
        );
    }

    match &outcome {
        Ok(report) => info!(
            event_name = "extract.completed",
            run_id = %run_id,
            database = %report.database_name,
            tables = report.table_count,
            columns = report.column_count,
            warnings = report.warnings.len(),
            "extraction completed"
        ),
        Err(error) => error!(
            event_name = "extract.failed",
            run_id = %run_id,
            error_class = error.error_class(),
            error = %error,
            "extraction failed"
        ),
    }

    outcome
}
