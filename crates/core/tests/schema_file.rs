use std::fs;

use schemadoc_core::catalog::memory::{InMemoryCatalog, InMemoryConnector};
use schemadoc_core::categorical::CategoricalConfig;
use schemadoc_core::errors::ExtractError;
use schemadoc_core::extractor::{run, ExtractionSettings};
use serde_json::json;
use tempfile::TempDir;

fn products_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new("shop_db")
        .with_table(
            "shop",
            "products",
            &[("id", "integer", false), ("name", "text", true), ("price", "numeric", true)],
            &["id"],
        )
        .with_row("shop", "products", [("id", json!(3)), ("name", json!("Pão"))])
        .with_row("shop", "products", [("id", json!(1)), ("name", json!("Café"))])
        .with_row("shop", "products", [("id", json!(2)), ("name", json!("Chá"))])
}

fn settings(dir: &TempDir, categorical: CategoricalConfig) -> ExtractionSettings {
    ExtractionSettings::new(categorical, 50, dir.path()).expect("valid settings")
}

fn yaml(path: &std::path::Path) -> serde_yaml::Value {
    let raw = fs::read_to_string(path).expect("schema file");
    serde_yaml::from_str(&raw).expect("valid yaml")
}

#[tokio::test]
async fn plain_table_is_written_without_samples() {
    let dir = TempDir::new().expect("tempdir");
    let connector = InMemoryConnector::new(products_catalog());

    let report =
        run(&connector, settings(&dir, CategoricalConfig::default())).await.expect("run");

    let document = yaml(&report.output_path);
    let tables = document["tables"].as_mapping().expect("tables mapping");
    assert_eq!(tables.len(), 1, "only the shop schema is present");

    let products = document["tables"]["shop"]["products"].as_sequence().expect("products");
    let names: Vec<&str> =
        products.iter().filter_map(|column| column["column_name"].as_str()).collect();
    assert_eq!(names, vec!["id", "name", "price"]);
    assert!(products.iter().all(|column| column.get("possible_values").is_none()));
}

#[tokio::test]
async fn categorical_column_lists_id_value_pairs_in_key_order() {
    let dir = TempDir::new().expect("tempdir");
    let connector = InMemoryConnector::new(products_catalog());
    let categorical =
        CategoricalConfig::from_entries([("products", vec!["name"])]).expect("categorical");

    let report = run(&connector, settings(&dir, categorical)).await.expect("run");

    let document = yaml(&report.output_path);
    let values = document["tables"]["shop"]["products"][1]["possible_values"]
        .as_sequence()
        .expect("possible_values");
    let pairs: Vec<(i64, &str)> = values
        .iter()
        .map(|entry| {
            (entry["id"].as_i64().expect("id"), entry["name"].as_str().expect("name"))
        })
        .collect();
    assert_eq!(pairs, vec![(1, "Café"), (2, "Chá"), (3, "Pão")]);
}

#[tokio::test]
async fn failed_connection_leaves_existing_file_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let existing = dir.path().join("schema_shop_db.yaml");
    fs::write(&existing, "tables: {}\n").expect("seed file");

    let connector = InMemoryConnector::refusing("connection refused");
    let error = run(&connector, settings(&dir, CategoricalConfig::default()))
        .await
        .expect_err("connection must fail");

    assert!(matches!(error, ExtractError::Connection(_)));
    assert_eq!(fs::read_to_string(&existing).expect("read"), "tables: {}\n");
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
}
