//! SQL text for the catalog queries.
//!
//! Catalog lookups bind every value. Sample queries have to splice schema,
//! table and column names into the statement, so those go through
//! [`quote_ident`]; only the row limit is a bind parameter.

pub const CURRENT_DATABASE: &str = "SELECT current_database()::text AS name";

pub const LIST_COLUMNS: &str = "
SELECT table_schema::text AS table_schema,
       table_name::text AS table_name,
       column_name::text AS column_name,
       data_type::text AS data_type,
       is_nullable::text AS is_nullable
FROM information_schema.columns
WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
ORDER BY table_schema, table_name, ordinal_position";

pub const PRIMARY_KEY_COLUMNS: &str = "
SELECT kcu.column_name::text AS column_name
FROM information_schema.table_constraints AS tc
JOIN information_schema.key_column_usage AS kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
 AND tc.table_name = kcu.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = $1
  AND tc.table_name = $2
ORDER BY kcu.ordinal_position";

/// Quotes an identifier for Postgres, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Non-null values of `column` with their row's key as JSON, in key order.
/// `$1` is the row limit.
pub fn sample_query(schema: &str, table: &str, column: &str, primary_key: &str) -> String {
    let pk = quote_ident(primary_key);
    let col = quote_ident(column);
    format!(
        "SELECT to_jsonb(t.{pk}) AS id, t.{col}::text AS value \
         FROM {schema}.{table} AS t \
         WHERE t.{col} IS NOT NULL \
         ORDER BY t.{pk} \
         LIMIT $1",
        schema = quote_ident(schema),
        table = quote_ident(table),
    )
}

#[cfg(test)]
mod tests {
    use super::{quote_ident, sample_query};

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(quote_ident("products"), "\"products\"");
        assert_eq!(quote_ident("Order Items"), "\"Order Items\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn sample_query_splices_quoted_names_and_binds_limit() {
        let sql = sample_query("shop", "products", "name", "id");
        assert_eq!(
            sql,
            "SELECT to_jsonb(t.\"id\") AS id, t.\"name\"::text AS value \
             FROM \"shop\".\"products\" AS t \
             WHERE t.\"name\" IS NOT NULL \
             ORDER BY t.\"id\" \
             LIMIT $1"
        );
    }

    #[test]
    fn hostile_names_cannot_escape_quoting() {
        let sql = sample_query("public", "t\"; DROP TABLE x; --", "c", "id");
        assert!(sql.contains("\"t\"\"; DROP TABLE x; --\""));
    }
}
