pub mod catalog;
pub mod categorical;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod output;
pub mod registry;
pub mod schema;

pub use catalog::{Catalog, CatalogColumn, CatalogError, Connector, SampleRequest};
pub use categorical::CategoricalConfig;
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{ExtractError, ExtractionWarning};
pub use extractor::{run, ExtractionReport, ExtractionSettings, SchemaExtractor};
pub use registry::{redact_url, DatabaseRegistry};
pub use schema::{ColumnDescriptor, SampledValue, SchemaDescriptor, SchemaDocument};
