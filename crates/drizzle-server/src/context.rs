//! Process-wide shared state: the config cache and the connection handle.
//!
//! Both live behind async mutexes so two in-flight invocations cannot race
//! the lazy-init check-then-act. First initializer wins for the connection
//! handle; a later `initialize` with a live handle is a no-op.

use crate::error::ServerError;
use drizzle_adapter::{DbHandle, SchemaEntry, TableEntry};
use drizzle_core::{ConfigResolver, LoadedConfig};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;

pub struct ServerContext {
    resolver: Mutex<ConfigResolver>,
    handle: Mutex<Option<DbHandle>>,
}

impl ServerContext {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self {
            resolver: Mutex::new(resolver),
            handle: Mutex::new(None),
        }
    }

    /// Load (or reuse) the drizzle config, honoring a per-call override path.
    pub async fn load_config(&self, explicit: Option<&Path>) -> Result<LoadedConfig, ServerError> {
        let mut resolver = self.resolver.lock().await;
        Ok(resolver.load(explicit)?)
    }

    /// Initialize the database connection. Idempotent: with a live handle
    /// this is a no-op regardless of the requested config.
    pub async fn initialize(&self, explicit: Option<&Path>) -> Result<String, ServerError> {
        let mut handle = self.handle.lock().await;
        if let Some(existing) = handle.as_ref() {
            return Ok(format!(
                "database already initialized ({}); run teardown before switching",
                existing.dialect()
            ));
        }

        let loaded = self.load_config(explicit).await?;
        let connected = DbHandle::connect(&loaded.config).await?;
        let message = format!(
            "database initialized: {} via {}",
            connected.dialect(),
            connected.driver()
        );
        info!(dialect = %connected.dialect(), driver = connected.driver(), "database initialized");
        *handle = Some(connected);
        Ok(message)
    }

    /// Run caller-supplied SQL against the live handle.
    pub async fn query(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<Map<String, Value>>, ServerError> {
        let handle = self.handle.lock().await;
        let handle = handle.as_ref().ok_or(drizzle_adapter::AdapterError::NotInitialized)?;
        Ok(handle.query(sql, params).await?)
    }

    pub async fn list_tables(&self) -> Result<Vec<TableEntry>, ServerError> {
        let handle = self.handle.lock().await;
        let handle = handle.as_ref().ok_or(drizzle_adapter::AdapterError::NotInitialized)?;
        Ok(handle.list_tables().await?)
    }

    pub async fn schema_dump(&self) -> Result<Vec<SchemaEntry>, ServerError> {
        let handle = self.handle.lock().await;
        let handle = handle.as_ref().ok_or(drizzle_adapter::AdapterError::NotInitialized)?;
        Ok(handle.schema_dump().await?)
    }

    /// Close the connection if one exists. Calling with no live handle is a
    /// no-op.
    pub async fn teardown(&self) {
        let mut handle = self.handle.lock().await;
        if let Some(live) = handle.take() {
            live.close().await;
        }
    }
}
