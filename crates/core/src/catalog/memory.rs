use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use super::{Catalog, CatalogColumn, CatalogError, Connector, SampleRequest};
use crate::schema::SampledValue;

type Row = IndexMap<String, Value>;

#[derive(Clone, Debug, Default)]
struct TableData {
    primary_key: Vec<String>,
    rows: Vec<Row>,
}

/// Catalog backed by plain data, for tests and offline tooling.
///
/// Clones share their close counter, so a test can hand a clone to a
/// connector and still observe whether the connection was released.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    database: String,
    columns: Vec<CatalogColumn>,
    tables: IndexMap<(String, String), TableData>,
    failing_query: Option<String>,
    open: bool,
    closes: Arc<AtomicUsize>,
}

impl InMemoryCatalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self { database: database.into(), open: true, ..Self::default() }
    }

    /// Declares a table; `columns` are `(name, data_type, is_nullable)` in
    /// ordinal order.
    pub fn with_table(
        mut self,
        schema: &str,
        table: &str,
        columns: &[(&str, &str, bool)],
        primary_key: &[&str],
    ) -> Self {
        for (name, data_type, is_nullable) in columns {
            self.columns.push(CatalogColumn {
                table_schema: schema.to_string(),
                table_name: table.to_string(),
                column_name: (*name).to_string(),
                data_type: (*data_type).to_string(),
                is_nullable: *is_nullable,
            });
        }
        let data = self.tables.entry((schema.to_string(), table.to_string())).or_default();
        data.primary_key = primary_key.iter().map(|key| (*key).to_string()).collect();
        self
    }

    pub fn with_row<'a>(
        mut self,
        schema: &str,
        table: &str,
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        let row = values.into_iter().map(|(column, value)| (column.to_string(), value)).collect();
        self.tables
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .rows
            .push(row);
        self
    }

    /// Makes every catalog query after connecting fail with `message`.
    pub fn with_failing_queries(mut self, message: impl Into<String>) -> Self {
        self.failing_query = Some(message.into());
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }

    fn ensure_usable(&self) -> Result<(), CatalogError> {
        if !self.open {
            return Err(CatalogError::Connection("connection is closed".to_string()));
        }
        match &self.failing_query {
            Some(message) => Err(CatalogError::Query(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn current_database(&mut self) -> Result<String, CatalogError> {
        if !self.open {
            return Err(CatalogError::Connection("connection is closed".to_string()));
        }
        Ok(self.database.clone())
    }

    async fn list_columns(&mut self) -> Result<Vec<CatalogColumn>, CatalogError> {
        self.ensure_usable()?;
        let mut columns = self.columns.clone();
        // Stable sort keeps declaration order as the ordinal position.
        columns.sort_by(|a, b| {
            (a.table_schema.as_str(), a.table_name.as_str())
                .cmp(&(b.table_schema.as_str(), b.table_name.as_str()))
        });
        Ok(columns)
    }

    async fn primary_key_columns(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<String>, CatalogError> {
        self.ensure_usable()?;
        Ok(self
            .tables
            .get(&(schema.to_string(), table.to_string()))
            .map(|data| data.primary_key.clone())
            .unwrap_or_default())
    }

    async fn sample_values(
        &mut self,
        request: &SampleRequest<'_>,
    ) -> Result<Vec<SampledValue>, CatalogError> {
        self.ensure_usable()?;
        let Some(data) = self.tables.get(&(request.schema.to_string(), request.table.to_string()))
        else {
            return Err(CatalogError::Query(format!(
                "relation \"{}.{}\" does not exist",
                request.schema, request.table
            )));
        };

        let mut rows: Vec<&Row> = data
            .rows
            .iter()
            .filter(|row| row.get(request.column).is_some_and(|value| !value.is_null()))
            .collect();
        rows.sort_by(|a, b| {
            compare_values(
                a.get(request.primary_key).unwrap_or(&Value::Null),
                b.get(request.primary_key).unwrap_or(&Value::Null),
            )
        });

        Ok(rows
            .into_iter()
            .take(request.limit as usize)
            .map(|row| SampledValue {
                id: row.get(request.primary_key).cloned().unwrap_or(Value::Null),
                value: match row.get(request.column) {
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
            })
            .collect())
    }

    async fn close(&mut self) -> Result<(), CatalogError> {
        if self.open {
            self.open = false;
            self.closes.fetch_add(1, AtomicOrdering::SeqCst);
        }
        Ok(())
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

/// Hands out clones of a prepared catalog, or refuses to connect.
#[derive(Clone, Debug)]
pub struct InMemoryConnector {
    catalog: InMemoryCatalog,
    refusal: Option<String>,
}

impl InMemoryConnector {
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self { catalog, refusal: None }
    }

    pub fn refusing(message: impl Into<String>) -> Self {
        Self { catalog: InMemoryCatalog::default(), refusal: Some(message.into()) }
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    type Catalog = InMemoryCatalog;

    async fn connect(&self) -> Result<InMemoryCatalog, CatalogError> {
        match &self.refusal {
            Some(message) => Err(CatalogError::Connection(message.clone())),
            None => {
                let mut catalog = self.catalog.clone();
                catalog.open = true;
                Ok(catalog)
            }
        }
    }

    fn target(&self) -> String {
        format!("memory://{}", self.catalog.database)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{InMemoryCatalog, InMemoryConnector};
    use crate::catalog::{Catalog, CatalogError, Connector, SampleRequest};

    fn products() -> InMemoryCatalog {
        InMemoryCatalog::new("shop_db")
            .with_table(
                "shop",
                "products",
                &[("id", "integer", false), ("name", "text", true)],
                &["id"],
            )
            .with_row("shop", "products", [("id", json!(3)), ("name", json!("c"))])
            .with_row("shop", "products", [("id", json!(1)), ("name", json!("a"))])
            .with_row("shop", "products", [("id", json!(2)), ("name", json!(null))])
    }

    #[tokio::test]
    async fn samples_skip_nulls_and_follow_key_order() {
        let mut catalog = products();
        let samples = catalog
            .sample_values(&SampleRequest {
                schema: "shop",
                table: "products",
                column: "name",
                primary_key: "id",
                limit: 10,
            })
            .await
            .expect("samples");

        let ids: Vec<_> = samples.iter().map(|sample| sample.id.clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_shared_between_clones() {
        let catalog = products();
        let connector = InMemoryConnector::new(catalog.clone());

        let mut connection = connector.connect().await.expect("connect");
        connection.close().await.expect("close");
        connection.close().await.expect("close again");

        assert_eq!(catalog.close_count(), 1);
        assert!(matches!(
            connection.list_columns().await,
            Err(CatalogError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn refusing_connector_reports_connection_error() {
        let connector = InMemoryConnector::refusing("password authentication failed");
        let result = connector.connect().await;
        assert!(matches!(result, Err(CatalogError::Connection(ref message)) if message.contains("password")));
    }
}
