//! In-memory description of a database's user schemas.
//!
//! The nesting mirrors the emitted file: schema -> table -> ordered columns.
//! Maps keep insertion order, which is catalog order, so the serialized file
//! diffs cleanly between runs.
//!
//! A sample entry is `{id: <key>, <column_name>: <value>}`. For a categorical
//! column that is itself named `id` the value goes under `value` instead, so
//! both halves of the pair survive a write and read back.

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type TableMap = IndexMap<String, Vec<ColumnDescriptor>>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescriptor {
    schemas: IndexMap<String, TableMap>,
}

/// Top-level shape of the schema file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub tables: SchemaDescriptor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub possible_values: Option<Vec<SampledValue>>,
}

/// One sampled value of a categorical column, paired with its row's key.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledValue {
    pub id: serde_json::Value,
    pub value: String,
}

impl SchemaDescriptor {
    /// Appends a column, creating its schema and table entries on first use.
    pub fn push_column(&mut self, schema: &str, table: &str, column: ColumnDescriptor) {
        self.schemas
            .entry(schema.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .push(column);
    }

    pub fn schemas(&self) -> impl Iterator<Item = (&str, &TableMap)> + '_ {
        self.schemas.iter().map(|(name, tables)| (name.as_str(), tables))
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&[ColumnDescriptor]> {
        self.schemas.get(schema)?.get(table).map(Vec::as_slice)
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn table_count(&self) -> usize {
        self.schemas.values().map(IndexMap::len).sum()
    }

    pub fn column_count(&self) -> usize {
        self.schemas.values().flat_map(IndexMap::values).map(Vec::len).sum()
    }
}

impl SchemaDocument {
    pub fn new(tables: SchemaDescriptor) -> Self {
        Self { tables }
    }
}

impl ColumnDescriptor {
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: bool,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable,
            possible_values: None,
        }
    }

    pub fn with_possible_values(mut self, values: Vec<SampledValue>) -> Self {
        self.possible_values = Some(values);
        self
    }
}

impl SampledValue {
    pub fn new(id: impl Into<serde_json::Value>, value: impl Into<String>) -> Self {
        Self { id: id.into(), value: value.into() }
    }
}

pub fn nullable_flag(is_nullable: bool) -> &'static str {
    if is_nullable {
        "YES"
    } else {
        "NO"
    }
}

pub fn parse_nullable_flag(flag: &str) -> Option<bool> {
    match flag.trim().to_ascii_uppercase().as_str() {
        "YES" => Some(true),
        "NO" => Some(false),
        _ => None,
    }
}

impl Serialize for ColumnDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.possible_values.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("column_name", &self.column_name)?;
        map.serialize_entry("data_type", &self.data_type)?;
        map.serialize_entry("is_nullable", nullable_flag(self.is_nullable))?;
        if let Some(values) = &self.possible_values {
            let keyed: Vec<KeyedSample<'_>> = values
                .iter()
                .map(|sample| KeyedSample { column: &self.column_name, sample })
                .collect();
            map.serialize_entry("possible_values", &keyed)?;
        }
        map.end()
    }
}

/// Key under which a sample's value is written for a column named `id`.
const SHADOWED_VALUE_KEY: &str = "value";

fn sample_value_key(column: &str) -> &str {
    if column == "id" {
        SHADOWED_VALUE_KEY
    } else {
        column
    }
}

struct KeyedSample<'a> {
    column: &'a str,
    sample: &'a SampledValue,
}

impl Serialize for KeyedSample<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("id", &self.sample.id)?;
        map.serialize_entry(sample_value_key(self.column), &self.sample.value)?;
        map.end()
    }
}

#[derive(Deserialize)]
struct RawColumn {
    column_name: String,
    data_type: String,
    is_nullable: String,
    #[serde(default)]
    possible_values: Option<Vec<IndexMap<String, serde_json::Value>>>,
}

impl<'de> Deserialize<'de> for ColumnDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawColumn::deserialize(deserializer)?;

        let is_nullable = parse_nullable_flag(&raw.is_nullable).ok_or_else(|| {
            D::Error::custom(format!(
                "is_nullable must be YES or NO, got `{}` for column `{}`",
                raw.is_nullable, raw.column_name
            ))
        })?;

        let possible_values = match raw.possible_values {
            Some(entries) => Some(
                entries
                    .into_iter()
                    .map(|mut entry| {
                        let id = entry.shift_remove("id").unwrap_or(serde_json::Value::Null);
                        let value = match entry.shift_remove(sample_value_key(&raw.column_name)) {
                            Some(value) => value,
                            None => {
                                return Err(D::Error::custom(format!(
                                    "possible_values entry for `{}` is missing its value",
                                    raw.column_name
                                )))
                            }
                        };
                        Ok(SampledValue { id, value: scalar_text(value) })
                    })
                    .collect::<Result<Vec<_>, D::Error>>()?,
            ),
            None => None,
        };

        Ok(Self {
            column_name: raw.column_name,
            data_type: raw.data_type,
            is_nullable,
            possible_values,
        })
    }
}

fn scalar_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}
