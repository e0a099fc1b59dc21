use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Failure of an extraction run. Driver errors are folded into the
/// connection/catalog categories as messages rather than wrapped.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("catalog query failed: {0}")]
    Catalog(String),
    #[error("could not write schema file `{path}`: {source}")]
    Output { path: PathBuf, source: std::io::Error },
    #[error("could not read schema file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
    #[error("could not serialize schema document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

impl ExtractError {
    /// Anything that goes wrong while acquiring the connection is a
    /// connection failure, whatever the driver called it.
    pub fn connection(error: CatalogError) -> Self {
        match error {
            CatalogError::Connection(message) | CatalogError::Query(message) => {
                Self::Connection(message)
            }
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Connection(_) => "db_connectivity",
            Self::Catalog(_) => "catalog_query",
            Self::Output { .. } | Self::Parse { .. } => "output",
            Self::Serialize(_) => "serialization",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Connection(_) => 4,
            Self::Catalog(_) | Self::Output { .. } | Self::Parse { .. } | Self::Serialize(_) => 5,
        }
    }
}

impl From<CatalogError> for ExtractError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::Connection(message) => Self::Connection(message),
            CatalogError::Query(message) => Self::Catalog(message),
        }
    }
}

/// Non-fatal condition recorded during extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// The table has no single-column primary key, so the categorical
    /// column was recorded without sampled values.
    MissingPrimaryKey { schema: String, table: String, column: String, key_columns: usize },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrimaryKey { schema, table, column, key_columns } => {
                if *key_columns == 0 {
                    write!(f, "no primary key found for table {schema}.{table}; skipped sampling {column}")
                } else {
                    write!(
                        f,
                        "table {schema}.{table} has a {key_columns}-column primary key; skipped sampling {column}"
                    )
                }
            }
        }
    }
}
