//! Seams between the extractor and the database it describes.
//!
//! `Connector` acquires one exclusive connection; `Catalog` is that
//! connection's view of the engine's catalog metadata. The Postgres
//! implementation lives in `schemadoc-db`, the in-memory one in [`memory`].

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::SampledValue;

pub mod memory;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Query(String),
}

/// One row of the engine's column catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogColumn {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Parameters of a categorical sample: at most `limit` non-null values of
/// `column`, ordered by `primary_key` ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleRequest<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub column: &'a str,
    pub primary_key: &'a str,
    pub limit: u32,
}

#[async_trait]
pub trait Catalog: Send {
    async fn current_database(&mut self) -> Result<String, CatalogError>;

    /// Every column outside the engine's system schemas, ordered by schema,
    /// table and ordinal position.
    async fn list_columns(&mut self) -> Result<Vec<CatalogColumn>, CatalogError>;

    /// Primary-key columns of a table in key order; empty when it has none.
    async fn primary_key_columns(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<String>, CatalogError>;

    async fn sample_values(
        &mut self,
        request: &SampleRequest<'_>,
    ) -> Result<Vec<SampledValue>, CatalogError>;

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Catalog: Catalog;

    async fn connect(&self) -> Result<Self::Catalog, CatalogError>;

    /// Connection target with credentials masked, for logs.
    fn target(&self) -> String;
}
