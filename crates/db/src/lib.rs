pub mod catalog;
pub mod connection;
pub mod queries;
pub mod query;

pub use catalog::{PgCatalog, PgConnector};
pub use connection::{connect, connect_with_timeout, DEFAULT_CONNECT_TIMEOUT_SECS};
pub use query::{run_query, QueryResult};
