//! Schema file naming and persistence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ExtractError;
use crate::schema::SchemaDocument;

pub const SCHEMA_FILE_PREFIX: &str = "schema_";
pub const SCHEMA_FILE_EXTENSION: &str = "yaml";

/// Mode of a freshly written schema file, before the process umask.
#[cfg(unix)]
pub const SCHEMA_FILE_MODE: u32 = 0o644;

/// `schema_<database>.yaml`; path separators in the name become `_`.
pub fn schema_file_name(database_name: &str) -> String {
    let safe: String = database_name
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\') { '_' } else { ch })
        .collect();
    format!("{SCHEMA_FILE_PREFIX}{safe}.{SCHEMA_FILE_EXTENSION}")
}

pub fn schema_file_path(output_dir: &Path, database_name: &str) -> PathBuf {
    output_dir.join(schema_file_name(database_name))
}

/// Serializes `document` and replaces the database's schema file with it.
///
/// The document is rendered before anything touches the disk and lands via a
/// rename within `output_dir`; readers never see a partial file.
pub fn write_schema_file(
    output_dir: &Path,
    database_name: &str,
    document: &SchemaDocument,
) -> Result<PathBuf, ExtractError> {
    let rendered = serde_yaml::to_string(document)?;
    let path = schema_file_path(output_dir, database_name);
    let output_error = |source: std::io::Error| ExtractError::Output { path: path.clone(), source };

    fs::create_dir_all(output_dir).map_err(output_error)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".schema-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(SCHEMA_FILE_MODE));
    }
    let mut staged = builder.tempfile_in(output_dir).map_err(output_error)?;
    staged.write_all(rendered.as_bytes()).map_err(output_error)?;
    staged.as_file().sync_all().map_err(output_error)?;
    staged.persist(&path).map_err(|error| output_error(error.error))?;

    Ok(path)
}

pub fn read_schema_file(path: &Path) -> Result<SchemaDocument, ExtractError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ExtractError::Output { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&raw)
        .map_err(|source| ExtractError::Parse { path: path.to_path_buf(), source })
}
