//! # drizzle-adapter
//!
//! Connection provider for the drizzle-mcp server.
//!
//! [`DbHandle::connect`] dispatches on the config's dialect and yields a
//! process-scoped handle: an embedded sqlite database, or a postgres
//! connection through whichever driver family resolved first. The handle is
//! a closed enum, so the per-driver calling conventions are exhausted at
//! compile time rather than probed at run time.

pub mod error;
pub mod postgres;
pub mod sqlite;

pub use error::AdapterError;
pub use postgres::PgDriver;

use drizzle_core::{Dialect, DrizzleConfig};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

/// One table, as reported by `database://tables`.
#[derive(Debug, Clone, Serialize)]
pub struct TableEntry {
    pub name: String,
}

/// One table with its DDL, as reported by `database://schema`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaEntry {
    pub name: String,
    pub ddl: String,
}

/// A live database connection plus its query surface.
#[derive(Debug)]
pub enum DbHandle {
    Sqlite(sqlx::SqlitePool),
    Postgres(PgDriver),
}

impl DbHandle {
    /// Connect according to the config's dialect.
    pub async fn connect(config: &DrizzleConfig) -> Result<Self, AdapterError> {
        match config.dialect() {
            Some(Dialect::Sqlite) => Ok(Self::Sqlite(sqlite::connect(config).await?)),
            Some(Dialect::Postgresql) => Ok(Self::Postgres(
                postgres::connect(&config.db_credentials).await?,
            )),
            None => Err(AdapterError::UnsupportedDialect(config.dialect.clone())),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite(_) => Dialect::Sqlite,
            Self::Postgres(_) => Dialect::Postgresql,
        }
    }

    /// The driver servicing this handle, for diagnostics.
    pub fn driver(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(driver) => driver.family(),
        }
    }

    /// Execute caller-supplied SQL verbatim with positional string
    /// parameters. Parameterization is delegated to the driver; there is no
    /// statement allow-listing here.
    pub async fn query(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<Map<String, Value>>, AdapterError> {
        match self {
            Self::Sqlite(pool) => sqlite::query(pool, sql, params).await,
            Self::Postgres(driver) => postgres::query(driver, sql, params).await,
        }
    }

    /// Enumerate user tables via the dialect's catalog.
    pub async fn list_tables(&self) -> Result<Vec<TableEntry>, AdapterError> {
        match self {
            Self::Sqlite(pool) => sqlite::list_tables(pool).await,
            Self::Postgres(driver) => postgres::list_tables(driver).await,
        }
    }

    /// Per-table DDL. Sqlite returns the stored creation statement verbatim;
    /// postgres returns a placeholder (see `postgres::schema_dump`).
    pub async fn schema_dump(&self) -> Result<Vec<SchemaEntry>, AdapterError> {
        match self {
            Self::Sqlite(pool) => sqlite::schema_dump(pool).await,
            Self::Postgres(driver) => postgres::schema_dump(driver).await,
        }
    }

    /// Close the underlying connection.
    pub async fn close(self) {
        let dialect = self.dialect();
        match self {
            Self::Sqlite(pool) => pool.close().await,
            Self::Postgres(driver) => postgres::close(driver).await,
        }
        info!(%dialect, "database connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drizzle_core::DbCredentials;

    #[tokio::test]
    async fn unsupported_dialect_fails_closed() {
        let config = DrizzleConfig {
            dialect: "oracle".to_string(),
            db_credentials: DbCredentials::default(),
            schema: None,
            out: None,
            extra: Map::new(),
        };

        let err = DbHandle::connect(&config).await.unwrap_err();
        match err {
            AdapterError::UnsupportedDialect(d) => assert_eq!(d, "oracle"),
            other => panic!("expected UnsupportedDialect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sqlite_handle_reports_dialect_and_driver() {
        let config = DrizzleConfig {
            dialect: "sqlite".to_string(),
            db_credentials: DbCredentials {
                url: Some(":memory:".to_string()),
                ..Default::default()
            },
            schema: None,
            out: None,
            extra: Map::new(),
        };

        let handle = DbHandle::connect(&config).await.unwrap();
        assert_eq!(handle.dialect(), Dialect::Sqlite);
        assert_eq!(handle.driver(), "sqlite");
        handle.close().await;
    }
}
