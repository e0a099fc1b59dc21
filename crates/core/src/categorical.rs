//! Caller-supplied designation of categorical columns.
//!
//! A categorical column is one whose distinct values are worth enumerating
//! for downstream consumers (status codes, category names, ...). Entries are
//! keyed by bare table name, so a table name shared by several schemas is
//! sampled in each of them.

use indexmap::{IndexMap, IndexSet};

use crate::config::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoricalConfig {
    tables: IndexMap<String, IndexSet<String>>,
}

impl CategoricalConfig {
    /// Builds the config, rejecting blank table or column names.
    pub fn from_entries<T, C, I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut config = Self::default();
        for (table, columns) in entries {
            let table = table.into();
            if table.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "extraction.categorical table names must not be empty".to_string(),
                ));
            }

            let set = config.tables.entry(table.clone()).or_default();
            for column in columns {
                let column = column.into();
                if column.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "extraction.categorical.{table} contains an empty column name"
                    )));
                }
                set.insert(column);
            }
        }
        Ok(config)
    }

    /// Parses the CLI form `table=col_a,col_b`.
    pub fn parse_spec(spec: &str) -> Result<(String, Vec<String>), ConfigError> {
        let Some((table, columns)) = spec.split_once('=') else {
            return Err(ConfigError::Validation(format!(
                "categorical spec `{spec}` must look like `table=column[,column...]`"
            )));
        };

        let columns: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string)
            .collect();
        if columns.is_empty() {
            return Err(ConfigError::Validation(format!(
                "categorical spec `{spec}` names no columns"
            )));
        }

        Ok((table.trim().to_string(), columns))
    }

    pub fn is_categorical(&self, table: &str, column: &str) -> bool {
        self.tables.get(table).is_some_and(|columns| columns.contains(column))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(IndexSet::is_empty)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, Vec<&str>)> + '_ {
        self.tables
            .iter()
            .map(|(table, columns)| (table.as_str(), columns.iter().map(String::as_str).collect()))
    }
}
