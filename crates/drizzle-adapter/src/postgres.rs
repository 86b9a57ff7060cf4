//! PostgreSQL engine: two driver families behind one dispatch point.
//!
//! Family A is sqlx (tried first); family B is tokio-postgres. Each family
//! can be compiled out with a cargo feature, in which case resolution falls
//! through to the next candidate. A connect failure from an *available*
//! family is fatal immediately — only unavailability is swallowed.

use crate::error::AdapterError;
use crate::{SchemaEntry, TableEntry};
use drizzle_core::{DbCredentials, Dialect};
use serde_json::{Map, Value};
use tracing::{debug, info};

const LIST_TABLES_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_type = 'BASE TABLE' ORDER BY table_name";

/// A live postgres connection, tagged with the driver family that won
/// resolution. The tag determines the calling convention at query time.
#[derive(Debug)]
pub enum PgDriver {
    #[cfg(feature = "postgres-sqlx")]
    Sqlx(sqlx::PgPool),
    #[cfg(feature = "postgres-native")]
    Native {
        client: tokio_postgres::Client,
        /// Drives the connection I/O; completes once the client is dropped.
        task: tokio::task::JoinHandle<()>,
    },
}

impl PgDriver {
    pub fn family(&self) -> &'static str {
        match self {
            #[cfg(feature = "postgres-sqlx")]
            Self::Sqlx(_) => "sqlx",
            #[cfg(feature = "postgres-native")]
            Self::Native { .. } => "tokio-postgres",
        }
    }
}

/// Build the connection string: `url` verbatim when present, otherwise
/// synthesized from the credential parts.
pub fn connection_string(creds: &DbCredentials) -> Result<String, AdapterError> {
    if let Some(url) = creds.url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.to_string());
    }

    let missing = |field| AdapterError::MissingCredential {
        dialect: Dialect::Postgresql,
        field,
    };
    let host = creds.host.as_deref().filter(|v| !v.is_empty()).ok_or(missing("host"))?;
    let user = creds.user.as_deref().filter(|v| !v.is_empty()).ok_or(missing("user"))?;
    let database = creds
        .database
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(missing("database"))?;
    let password = creds.password.as_deref().unwrap_or("");
    let port = creds.port.unwrap_or(5432);

    Ok(format!(
        "postgresql://{user}:{password}@{host}:{port}/{database}"
    ))
}

/// Resolve a driver family and connect. Families are tried in priority
/// order; each one is either unavailable (compiled out) or authoritative.
pub async fn connect(creds: &DbCredentials) -> Result<PgDriver, AdapterError> {
    let url = connection_string(creds)?;
    let mut tried = Vec::new();

    match connect_sqlx(&url).await {
        Resolution::Connected(driver) => {
            info!(family = driver.family(), "postgresql driver resolved");
            return Ok(driver);
        }
        Resolution::Unavailable(reason) => tried.push(format!("sqlx ({reason})")),
        Resolution::Failed(err) => return Err(err),
    }

    match connect_native(&url).await {
        Resolution::Connected(driver) => {
            info!(family = driver.family(), "postgresql driver resolved");
            return Ok(driver);
        }
        Resolution::Unavailable(reason) => tried.push(format!("tokio-postgres ({reason})")),
        Resolution::Failed(err) => return Err(err),
    }

    Err(AdapterError::DriverUnavailable { tried })
}

enum Resolution {
    Connected(PgDriver),
    Unavailable(&'static str),
    Failed(AdapterError),
}

#[cfg(feature = "postgres-sqlx")]
async fn connect_sqlx(url: &str) -> Resolution {
    use sqlx::postgres::PgPoolOptions;

    debug!("attempting postgresql driver family: sqlx");
    match PgPoolOptions::new().max_connections(1).connect(url).await {
        Ok(pool) => Resolution::Connected(PgDriver::Sqlx(pool)),
        Err(e) => Resolution::Failed(AdapterError::pg_sqlx(e)),
    }
}

#[cfg(not(feature = "postgres-sqlx"))]
async fn connect_sqlx(_url: &str) -> Resolution {
    Resolution::Unavailable("compiled out")
}

#[cfg(feature = "postgres-native")]
async fn connect_native(url: &str) -> Resolution {
    debug!("attempting postgresql driver family: tokio-postgres");
    match tokio_postgres::connect(url, tokio_postgres::NoTls).await {
        Ok((client, connection)) => {
            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection task ended with error");
                }
            });
            Resolution::Connected(PgDriver::Native { client, task })
        }
        Err(e) => Resolution::Failed(AdapterError::pg_native(e)),
    }
}

#[cfg(not(feature = "postgres-native"))]
async fn connect_native(_url: &str) -> Resolution {
    Resolution::Unavailable("compiled out")
}

pub async fn query(
    driver: &PgDriver,
    sql: &str,
    params: &[String],
) -> Result<Vec<Map<String, Value>>, AdapterError> {
    match driver {
        #[cfg(feature = "postgres-sqlx")]
        PgDriver::Sqlx(pool) => {
            let mut query = sqlx::query(sql);
            for param in params {
                query = query.bind(param.as_str());
            }
            let rows = query
                .fetch_all(pool)
                .await
                .map_err(AdapterError::pg_sqlx)?;
            rows.iter().map(sqlx_row_to_json).collect()
        }
        #[cfg(feature = "postgres-native")]
        PgDriver::Native { client, .. } => {
            let bound: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = params
                .iter()
                .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
                .collect();
            let rows = client
                .query(sql, &bound)
                .await
                .map_err(AdapterError::pg_native)?;
            rows.iter().map(native_row_to_json).collect()
        }
    }
}

pub async fn list_tables(driver: &PgDriver) -> Result<Vec<TableEntry>, AdapterError> {
    let rows = query(driver, LIST_TABLES_SQL, &[]).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row.get("table_name") {
            Some(Value::String(name)) => Some(TableEntry { name: name.clone() }),
            _ => None,
        })
        .collect())
}

/// Placeholder DDL only: the dump names each table but does not reconstruct
/// its creation statement. Downstream consumers rely on this exact format.
pub async fn schema_dump(driver: &PgDriver) -> Result<Vec<SchemaEntry>, AdapterError> {
    let tables = list_tables(driver).await?;
    Ok(tables
        .into_iter()
        .map(|TableEntry { name }| SchemaEntry {
            ddl: format!("CREATE TABLE {name} (...)"),
            name,
        })
        .collect())
}

pub async fn close(driver: PgDriver) {
    match driver {
        #[cfg(feature = "postgres-sqlx")]
        PgDriver::Sqlx(pool) => pool.close().await,
        #[cfg(feature = "postgres-native")]
        PgDriver::Native { client, task } => {
            drop(client);
            let _ = task.await;
        }
    }
}

#[cfg(feature = "postgres-sqlx")]
fn sqlx_row_to_json(row: &sqlx::postgres::PgRow) -> Result<Map<String, Value>, AdapterError> {
    use sqlx::{Column, Row, TypeInfo};

    let mut object = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name().to_string();
        let value = match type_name.as_str() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, Value::Bool),
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            "INT8" => row
                .try_get::<Option<i64>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
                .map_or(Value::Null, Value::Number),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            "JSON" | "JSONB" => row
                .try_get::<Option<Value>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .unwrap_or(Value::Null),
            "BYTEA" => {
                use base64::Engine as _;
                row.try_get::<Option<Vec<u8>>, _>(idx)
                    .map_err(AdapterError::pg_sqlx)?
                    .map_or(Value::Null, |v| {
                        Value::String(base64::engine::general_purpose::STANDARD.encode(v))
                    })
            }
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::String(v.to_rfc3339())),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::String(v.to_string())),
            "DATE" => row
                .try_get::<Option<chrono::NaiveDate>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, |v| Value::String(v.to_string())),
            _ => row
                .try_get::<Option<String>, _>(idx)
                .map_err(AdapterError::pg_sqlx)?
                .map_or(Value::Null, Value::String),
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

#[cfg(feature = "postgres-native")]
fn native_row_to_json(row: &tokio_postgres::Row) -> Result<Map<String, Value>, AdapterError> {
    use tokio_postgres::types::Type;

    let mut object = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => row
                .try_get::<_, Option<bool>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, Value::Bool),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            Type::INT8 => row
                .try_get::<_, Option<i64>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::Number(v.into())),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .map_err(AdapterError::pg_native)?
                .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
                .map_or(Value::Null, Value::Number),
            Type::FLOAT8 => row
                .try_get::<_, Option<f64>>(idx)
                .map_err(AdapterError::pg_native)?
                .and_then(serde_json::Number::from_f64)
                .map_or(Value::Null, Value::Number),
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<Value>>(idx)
                .map_err(AdapterError::pg_native)?
                .unwrap_or(Value::Null),
            Type::BYTEA => {
                use base64::Engine as _;
                row.try_get::<_, Option<Vec<u8>>>(idx)
                    .map_err(AdapterError::pg_native)?
                    .map_or(Value::Null, |v| {
                        Value::String(base64::engine::general_purpose::STANDARD.encode(v))
                    })
            }
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::String(v.to_rfc3339())),
            Type::TIMESTAMP => row
                .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::String(v.to_string())),
            Type::DATE => row
                .try_get::<_, Option<chrono::NaiveDate>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, |v| Value::String(v.to_string())),
            _ => row
                .try_get::<_, Option<String>>(idx)
                .map_err(AdapterError::pg_native)?
                .map_or(Value::Null, Value::String),
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(
        url: Option<&str>,
        host: Option<&str>,
        user: Option<&str>,
        database: Option<&str>,
    ) -> DbCredentials {
        DbCredentials {
            url: url.map(String::from),
            host: host.map(String::from),
            port: None,
            user: user.map(String::from),
            password: None,
            database: database.map(String::from),
        }
    }

    #[test]
    fn url_is_used_verbatim() {
        let c = creds(Some("postgresql://u:p@h:5433/db"), None, None, None);
        assert_eq!(connection_string(&c).unwrap(), "postgresql://u:p@h:5433/db");
    }

    #[test]
    fn parts_synthesize_with_default_port() {
        let c = creds(None, Some("db.internal"), Some("app"), Some("appdb"));
        assert_eq!(
            connection_string(&c).unwrap(),
            "postgresql://app:@db.internal:5432/appdb"
        );
    }

    #[test]
    fn explicit_port_and_password_are_honored() {
        let mut c = creds(None, Some("h"), Some("u"), Some("d"));
        c.port = Some(5444);
        c.password = Some("secret".to_string());
        assert_eq!(
            connection_string(&c).unwrap(),
            "postgresql://u:secret@h:5444/d"
        );
    }

    #[tokio::test]
    async fn missing_parts_fail_before_any_connection() {
        for (c, field) in [
            (creds(None, None, Some("u"), Some("d")), "host"),
            (creds(None, Some("h"), None, Some("d")), "user"),
            (creds(None, Some("h"), Some("u"), None), "database"),
        ] {
            match connect(&c).await.unwrap_err() {
                AdapterError::MissingCredential {
                    dialect: Dialect::Postgresql,
                    field: f,
                } => assert_eq!(f, field),
                other => panic!("expected MissingCredential, got {other:?}"),
            }
        }
    }
}
