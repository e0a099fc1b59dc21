use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;

use schemadoc_core::catalog::CatalogError;
pub use schemadoc_core::config::DEFAULT_CONNECT_TIMEOUT_SECS;

/// Opens one exclusive connection; the extractor never needs a pool.
pub async fn connect(database_url: &str) -> Result<PgConnection, CatalogError> {
    connect_with_timeout(database_url, DEFAULT_CONNECT_TIMEOUT_SECS).await
}

pub async fn connect_with_timeout(
    database_url: &str,
    timeout_secs: u64,
) -> Result<PgConnection, CatalogError> {
    let options = PgConnectOptions::from_str(database_url)
        .map_err(|error| CatalogError::Connection(format!("invalid database url: {error}")))?
        .application_name("schemadoc");

    let timeout = Duration::from_secs(timeout_secs.max(1));
    match tokio::time::timeout(timeout, options.connect()).await {
        Ok(Ok(connection)) => Ok(connection),
        Ok(Err(error)) => Err(connection_error(error)),
        Err(_) => Err(CatalogError::Connection(format!(
            "timed out after {}s waiting for the database",
            timeout.as_secs()
        ))),
    }
}

pub(crate) fn connection_error(error: sqlx::Error) -> CatalogError {
    CatalogError::Connection(error.to_string())
}

pub(crate) fn query_error(error: sqlx::Error) -> CatalogError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => CatalogError::Connection(error.to_string()),
        other => CatalogError::Query(other.to_string()),
    }
}
