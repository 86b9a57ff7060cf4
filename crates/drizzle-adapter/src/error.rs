//! Error types for the connection provider.

use drizzle_core::Dialect;
use thiserror::Error;

/// Errors that can occur while initializing or using a database handle.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The config declares a dialect this adapter cannot serve.
    #[error("unsupported dialect `{0}`")]
    UnsupportedDialect(String),

    /// A credential field required by the dialect is absent.
    #[error("missing credential for {dialect}: `dbCredentials.{field}` is required")]
    MissingCredential {
        dialect: Dialect,
        field: &'static str,
    },

    /// Every candidate postgres driver family failed to resolve.
    #[error("no postgresql driver available (tried: {})", .tried.join(", "))]
    DriverUnavailable { tried: Vec<String> },

    /// A query or teardown was requested before `initialize`.
    #[error("database is not initialized")]
    NotInitialized,

    /// Driver-level failure (connect, execute, or decode).
    #[error("{family} driver error: {message}")]
    Driver {
        family: &'static str,
        message: String,
    },
}

impl AdapterError {
    pub(crate) fn sqlite(e: sqlx::Error) -> Self {
        Self::Driver {
            family: "sqlite",
            message: e.to_string(),
        }
    }

    #[cfg(feature = "postgres-sqlx")]
    pub(crate) fn pg_sqlx(e: sqlx::Error) -> Self {
        Self::Driver {
            family: "sqlx",
            message: e.to_string(),
        }
    }

    #[cfg(feature = "postgres-native")]
    pub(crate) fn pg_native(e: tokio_postgres::Error) -> Self {
        Self::Driver {
            family: "tokio-postgres",
            message: e.to_string(),
        }
    }
}
