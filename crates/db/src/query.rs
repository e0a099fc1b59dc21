//! Ad-hoc statements for inspecting a database from the command line.
//!
//! Values come back as JSON so any result set can be printed or serialized
//! without knowing its shape up front.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};
use uuid::Uuid;

use schemadoc_core::catalog::CatalogError;

use crate::catalog::PgCatalog;
use crate::connection::query_error;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Set when more rows were available than `max_rows`.
    pub truncated: bool,
}

/// Runs `sql` and collects at most `max_rows` rows.
///
/// Column names come from the statement description, so a query that
/// matches nothing still reports its columns.
pub async fn run_query(
    connection: &mut PgConnection,
    sql: &str,
    max_rows: usize,
) -> Result<QueryResult, CatalogError> {
    let description = (&mut *connection).describe(sql).await.map_err(query_error)?;
    let columns: Vec<String> =
        description.columns().iter().map(|column| column.name().to_string()).collect();

    let mut result = QueryResult { columns, ..QueryResult::default() };
    let mut stream = sqlx::query(sql).fetch(&mut *connection);
    while let Some(row) = stream.try_next().await.map_err(query_error)? {
        if result.rows.len() == max_rows {
            result.truncated = true;
            break;
        }
        result.rows.push(row_values(&row)?);
    }

    Ok(result)
}

impl PgCatalog {
    pub async fn run_query(&mut self, sql: &str, max_rows: usize) -> Result<QueryResult, CatalogError> {
        run_query(self.connection()?, sql, max_rows).await
    }
}

fn row_values(row: &PgRow) -> Result<Vec<Value>, CatalogError> {
    (0..row.columns().len()).map(|index| column_value(row, index)).collect()
}

fn column_value(row: &PgRow, index: usize) -> Result<Value, CatalogError> {
    let raw = row.try_get_raw(index).map_err(query_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => Value::from(get::<bool>(row, index)?),
        "INT2" => Value::from(get::<i16>(row, index)?),
        "INT4" => Value::from(get::<i32>(row, index)?),
        "INT8" => Value::from(get::<i64>(row, index)?),
        "FLOAT4" => Value::from(get::<f32>(row, index)?),
        "FLOAT8" => Value::from(get::<f64>(row, index)?),
        "NUMERIC" => Value::String(get::<Decimal>(row, index)?.to_string()),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" | "CITEXT" => {
            Value::String(get::<String>(row, index)?)
        }
        "JSON" | "JSONB" => get::<Value>(row, index)?,
        "UUID" => Value::String(get::<Uuid>(row, index)?.to_string()),
        "DATE" => Value::String(get::<NaiveDate>(row, index)?.to_string()),
        "TIME" => Value::String(get::<NaiveTime>(row, index)?.to_string()),
        "TIMESTAMP" => Value::String(get::<NaiveDateTime>(row, index)?.to_string()),
        "TIMESTAMPTZ" => Value::String(get::<DateTime<Utc>>(row, index)?.to_rfc3339()),
        "TEXT[]" | "VARCHAR[]" => Value::from(get::<Vec<String>>(row, index)?),
        "INT4[]" => Value::from(get::<Vec<i32>>(row, index)?),
        "INT8[]" => Value::from(get::<Vec<i64>>(row, index)?),
        other => Value::String(format!("<unsupported {other}>")),
    };

    Ok(value)
}

fn get<T>(row: &PgRow, index: usize) -> Result<T, CatalogError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(index).map_err(query_error)
}
