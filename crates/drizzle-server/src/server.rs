//! MCP server implementation.
//!
//! Routes incoming JSON-RPC requests to tool and resource handlers. Tool
//! handler errors are converted into `isError` result envelopes so the
//! process never crashes on a failed invocation; resource read errors are
//! propagated as JSON-RPC errors instead (a failed read is a transport
//! failure, not a tool result).

use crate::context::ServerContext;
use crate::error::ServerError;
use crate::protocol::*;
use crate::{resources, runner, tools};
use drizzle_core::ConfigResolver;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// The MCP server.
pub struct McpServer {
    context: ServerContext,
}

impl McpServer {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self {
            context: ServerContext::new(resolver),
        }
    }

    /// Shared state, exposed for lifecycle management (signal teardown).
    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Serve requests over stdio until EOF. One line in, one line out;
    /// malformed lines get a parse-error response instead of killing the
    /// loop.
    pub async fn run_stdio(&self) -> Result<(), ServerError> {
        info!("starting MCP server with stdio transport");

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!(error = %e, "discarding malformed request line");
                    JsonRpcResponse::error(None, -32700, format!("parse error: {e}"))
                }
            };

            let mut payload = serde_json::to_string(&response)?;
            payload.push('\n');
            stdout.write_all(payload.as_bytes()).await?;
            stdout.flush().await?;
        }

        Ok(())
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" => {
                JsonRpcResponse::success(id, json!({}))
            }
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "resources/list" => self.handle_list_resources(id),
            "resources/read" => self.handle_read_resource(id, request.params).await,
            "shutdown" => self.handle_shutdown(id).await,
            _ => JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": "drizzle-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {},
                "resources": {}
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": tools::definitions() }))
    }

    fn handle_list_resources(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "resources": resources::definitions() }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"))
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        // Every handler error becomes a failed-result envelope; the caller
        // sees human-readable text, never an unstructured fault.
        let response = match self.dispatch_tool(&params.name, &params.arguments).await {
            Ok(text) => CallToolResponse::text(text),
            Err(e) => {
                warn!(tool = %params.name, error = %e, "tool invocation failed");
                CallToolResponse::error(e.to_string())
            }
        };

        match serde_json::to_value(&response) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
        }
    }

    async fn dispatch_tool(&self, name: &str, args: &Value) -> Result<String, ServerError> {
        match name {
            tools::GENERATE_MIGRATION => {
                let migration_name = require_string(args, "name")?;
                if !tools::MIGRATION_NAME.is_match(migration_name) {
                    return Err(ServerError::Validation(format!(
                        "migration name `{migration_name}` must match {}",
                        tools::MIGRATION_NAME_PATTERN
                    )));
                }
                let loaded = self.context.load_config(config_override(args)?.as_deref()).await?;
                runner::run_drizzle_kit(
                    "generate",
                    &loaded.path,
                    &loaded.dir,
                    &["--name", migration_name],
                )
                .await
            }
            tools::RUN_MIGRATIONS => {
                let loaded = self.context.load_config(config_override(args)?.as_deref()).await?;
                runner::run_drizzle_kit("migrate", &loaded.path, &loaded.dir, &[]).await
            }
            tools::INTROSPECT_SCHEMA => {
                let loaded = self.context.load_config(config_override(args)?.as_deref()).await?;
                runner::run_drizzle_kit("introspect", &loaded.path, &loaded.dir, &[]).await
            }
            tools::EXECUTE_QUERY => {
                let sql = require_string(args, "query")?;
                let params = string_array(args, "params")?;
                let rows = self.context.query(sql, &params).await?;
                Ok(serde_json::to_string(&rows)?)
            }
            tools::INITIALIZE_DATABASE => {
                self.context.initialize(config_override(args)?.as_deref()).await
            }
            other => Err(ServerError::UnknownTool(other.to_string())),
        }
    }

    async fn handle_read_resource(
        &self,
        id: Option<Value>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: ReadResourceParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"))
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        let text = match self.read_resource(&params.uri).await {
            Ok(text) => text,
            // Resource failures are transport-level, unlike tool errors.
            Err(e @ ServerError::UnknownResource(_)) => {
                return JsonRpcResponse::error(id, -32002, e.to_string())
            }
            Err(e) => return JsonRpcResponse::error(id, -32603, e.to_string()),
        };

        JsonRpcResponse::success(
            id,
            json!({
                "contents": [{
                    "uri": params.uri,
                    "mimeType": "application/json",
                    "text": text
                }]
            }),
        )
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ServerError> {
        match uri {
            resources::TABLES_URI => {
                let tables = self.context.list_tables().await?;
                Ok(serde_json::to_string(&tables)?)
            }
            resources::SCHEMA_URI => {
                let dump = self.context.schema_dump().await?;
                Ok(serde_json::to_string(&dump)?)
            }
            other => Err(ServerError::UnknownResource(other.to_string())),
        }
    }

    async fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("MCP server shutdown requested");
        self.context.teardown().await;
        JsonRpcResponse::success(id, json!(null))
    }
}

/// Extract a required string argument.
fn require_string<'a>(args: &'a Value, field: &str) -> Result<&'a str, ServerError> {
    match args.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ServerError::Validation(format!(
            "`{field}` must be a string"
        ))),
        None => Err(ServerError::Validation(format!("`{field}` is required"))),
    }
}

/// Extract the optional `config` path override.
fn config_override(args: &Value) -> Result<Option<PathBuf>, ServerError> {
    match args.get("config") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(PathBuf::from(s))),
        Some(_) => Err(ServerError::Validation(
            "`config` must be a string path".to_string(),
        )),
    }
}

/// Extract the optional `params` array; defaults to empty, rejects
/// non-string elements.
fn string_array(args: &Value, field: &str) -> Result<Vec<String>, ServerError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ServerError::Validation(format!(
                    "`{field}` must be an array of strings"
                ))),
            })
            .collect(),
        Some(_) => Err(ServerError::Validation(format!(
            "`{field}` must be an array of strings"
        ))),
    }
}
