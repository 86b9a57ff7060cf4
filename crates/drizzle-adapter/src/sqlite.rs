//! SQLite engine: embedded file (or in-memory) database via sqlx.

use crate::error::AdapterError;
use crate::{SchemaEntry, TableEntry};
use base64::Engine as _;
use drizzle_core::{Dialect, DrizzleConfig};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

/// Open (or create) the sqlite database named by `dbCredentials.url`.
///
/// The pool is capped at a single connection: the process holds at most one
/// connection, and an in-memory database must not be split across pooled
/// connections.
pub async fn connect(config: &DrizzleConfig) -> Result<SqlitePool, AdapterError> {
    let url = config
        .db_credentials
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(AdapterError::MissingCredential {
            dialect: Dialect::Sqlite,
            field: "url",
        })?;

    let options = SqliteConnectOptions::new()
        .filename(url)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(AdapterError::sqlite)?;

    debug!(url, "sqlite database opened");
    Ok(pool)
}

pub async fn query(
    pool: &SqlitePool,
    sql: &str,
    params: &[String],
) -> Result<Vec<Map<String, Value>>, AdapterError> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = query.bind(param.as_str());
    }

    let rows = query
        .fetch_all(pool)
        .await
        .map_err(AdapterError::sqlite)?;
    rows.iter().map(row_to_json).collect()
}

pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<TableEntry>, AdapterError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(AdapterError::sqlite)?;

    Ok(rows
        .into_iter()
        .map(|(name,)| TableEntry { name })
        .collect())
}

/// Each table with its stored `CREATE TABLE` statement, verbatim.
pub async fn schema_dump(pool: &SqlitePool) -> Result<Vec<SchemaEntry>, AdapterError> {
    let rows: Vec<(String, Option<String>)> = sqlx::query_as(
        "SELECT name, sql FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(AdapterError::sqlite)?;

    Ok(rows
        .into_iter()
        .map(|(name, sql)| {
            let ddl = sql.unwrap_or_else(|| format!("CREATE TABLE {name} (...)"));
            SchemaEntry { name, ddl }
        })
        .collect())
}

fn row_to_json(row: &SqliteRow) -> Result<Map<String, Value>, AdapterError> {
    let mut object = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), value_to_json(row, idx)?);
    }
    Ok(object)
}

fn value_to_json(row: &SqliteRow, idx: usize) -> Result<Value, AdapterError> {
    let type_name = row.columns()[idx].type_info().name().to_uppercase();

    let value = match type_name.as_str() {
        "NULL" => Value::Null,
        "INTEGER" | "INT4" | "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .map_err(AdapterError::sqlite)?
            .map_or(Value::Null, |v| Value::Number(v.into())),
        "REAL" => row
            .try_get::<Option<f64>, _>(idx)
            .map_err(AdapterError::sqlite)?
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(idx)
            .map_err(AdapterError::sqlite)?
            .map_or(Value::Null, Value::Bool),
        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .map_err(AdapterError::sqlite)?
            .map_or(Value::Null, |v| {
                Value::String(base64::engine::general_purpose::STANDARD.encode(v))
            }),
        // TEXT and anything sqlite stored with a custom type affinity.
        _ => row
            .try_get::<Option<String>, _>(idx)
            .map_err(AdapterError::sqlite)?
            .map_or(Value::Null, Value::String),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_core::DbCredentials;
    use serde_json::json;

    fn sqlite_config(url: &str) -> DrizzleConfig {
        DrizzleConfig {
            dialect: "sqlite".to_string(),
            db_credentials: DbCredentials {
                url: Some(url.to_string()),
                ..Default::default()
            },
            schema: None,
            out: None,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn fresh_database_has_no_tables() {
        let pool = connect(&sqlite_config(":memory:")).await.unwrap();
        assert!(list_tables(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_table_appears_in_listing_and_dump() {
        let pool = connect(&sqlite_config(":memory:")).await.unwrap();
        query(&pool, "CREATE TABLE t(id INTEGER)", &[]).await.unwrap();

        let tables = list_tables(&pool).await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "t");

        let dump = schema_dump(&pool).await.unwrap();
        assert_eq!(dump[0].name, "t");
        assert!(dump[0].ddl.contains("CREATE TABLE t"));
    }

    #[tokio::test]
    async fn insert_and_select_round_trip() {
        let pool = connect(&sqlite_config(":memory:")).await.unwrap();
        query(&pool, "CREATE TABLE t(id INTEGER, label TEXT)", &[])
            .await
            .unwrap();
        query(
            &pool,
            "INSERT INTO t VALUES (?, ?)",
            &["1".to_string(), "hello".to_string()],
        )
        .await
        .unwrap();

        let rows = query(&pool, "SELECT * FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&json!(1)));
        assert_eq!(rows[0].get("label"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn missing_url_fails_with_missing_credential() {
        let mut config = sqlite_config(":memory:");
        config.db_credentials.url = None;

        let err = connect(&config).await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::MissingCredential {
                dialect: Dialect::Sqlite,
                field: "url"
            }
        ));
    }

    #[tokio::test]
    async fn file_database_is_created_on_connect() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fresh.db");
        let pool = connect(&sqlite_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        assert!(db_path.exists());
        assert!(list_tables(&pool).await.unwrap().is_empty());
    }
}
