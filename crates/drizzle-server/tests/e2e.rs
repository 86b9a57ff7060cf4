//! End-to-end flow against a scratch sqlite database: initialize, mutate,
//! read both resources, tear down.

use drizzle_core::ConfigResolver;
use drizzle_server::protocol::{JsonRpcRequest, JsonRpcResponse};
use drizzle_server::McpServer;
use serde_json::{json, Value};
use std::path::Path;

fn write_sqlite_config(dir: &Path) {
    let db_path = dir.join("app.db");
    let config = json!({
        "dialect": "sqlite",
        "dbCredentials": { "url": db_path.to_str().unwrap() },
        "schema": "./schema.ts",
        "out": "./drizzle"
    });
    std::fs::write(
        dir.join("drizzle.config.json"),
        serde_json::to_string_pretty(&config).unwrap(),
    )
    .unwrap();
}

fn request(method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(1)),
        method: method.to_string(),
        params: Some(params),
    }
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (bool, String) {
    let response = server
        .handle_request(request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        ))
        .await;
    let result = response.result.expect("tool call should produce a result");
    let is_error = result["isError"].as_bool().unwrap_or(false);
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    (is_error, text)
}

async fn read_resource(server: &McpServer, uri: &str) -> JsonRpcResponse {
    server
        .handle_request(request("resources/read", json!({ "uri": uri })))
        .await
}

fn resource_json(response: &JsonRpcResponse) -> Value {
    let text = response.result.as_ref().unwrap()["contents"][0]["text"]
        .as_str()
        .unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn sqlite_lifecycle_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_sqlite_config(dir.path());
    let server = McpServer::new(ConfigResolver::new(dir.path()));

    // Fresh database: initialize, then confirm it is empty.
    let (is_error, text) = call_tool(&server, "initialize_database", json!({})).await;
    assert!(!is_error, "initialize failed: {text}");
    assert!(text.contains("sqlite"));

    let tables = resource_json(&read_resource(&server, "database://tables").await);
    assert_eq!(tables, json!([]));

    // Create and populate a table through execute_query.
    let (is_error, _) = call_tool(
        &server,
        "execute_query",
        json!({ "query": "CREATE TABLE t(id INTEGER)" }),
    )
    .await;
    assert!(!is_error);

    let (is_error, _) = call_tool(
        &server,
        "execute_query",
        json!({ "query": "INSERT INTO t VALUES (?)", "params": ["1"] }),
    )
    .await;
    assert!(!is_error);

    // Both resources observe the new table.
    let tables = resource_json(&read_resource(&server, "database://tables").await);
    assert_eq!(tables, json!([{ "name": "t" }]));

    let schema = resource_json(&read_resource(&server, "database://schema").await);
    assert_eq!(schema[0]["name"], "t");
    assert!(schema[0]["ddl"].as_str().unwrap().contains("CREATE TABLE t"));

    // Inserted row reads back with identical values.
    let (is_error, rows) = call_tool(
        &server,
        "execute_query",
        json!({ "query": "SELECT * FROM t" }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(serde_json::from_str::<Value>(&rows).unwrap(), json!([{ "id": 1 }]));
}

#[tokio::test]
async fn initialize_is_idempotent_and_teardown_survives_repeats() {
    let dir = tempfile::tempdir().unwrap();
    write_sqlite_config(dir.path());
    let server = McpServer::new(ConfigResolver::new(dir.path()));

    let (is_error, first) = call_tool(&server, "initialize_database", json!({})).await;
    assert!(!is_error);
    assert!(first.contains("initialized"));

    let (is_error, second) = call_tool(&server, "initialize_database", json!({})).await;
    assert!(!is_error);
    assert!(second.contains("already initialized"));

    // One underlying connection: the first teardown closes it, the second
    // is a no-op rather than a double-close.
    server.context().teardown().await;
    server.context().teardown().await;

    let (is_error, text) = call_tool(
        &server,
        "execute_query",
        json!({ "query": "SELECT 1" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("not initialized"));
}

#[tokio::test]
async fn explicit_config_override_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    // No conventional config in the working directory; only an override.
    let override_path = dir.path().join("configs").join("alt.config.json");
    std::fs::create_dir_all(override_path.parent().unwrap()).unwrap();
    let db_path = dir.path().join("alt.db");
    std::fs::write(
        &override_path,
        json!({
            "dialect": "sqlite",
            "dbCredentials": { "url": db_path.to_str().unwrap() }
        })
        .to_string(),
    )
    .unwrap();

    let server = McpServer::new(ConfigResolver::new(dir.path()));

    let (is_error, text) = call_tool(
        &server,
        "initialize_database",
        json!({ "config": override_path.to_str().unwrap() }),
    )
    .await;
    assert!(!is_error, "initialize with override failed: {text}");
    assert!(db_path.exists());
}

#[tokio::test]
async fn postgres_connect_failure_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("drizzle.config.json"),
        json!({
            "dialect": "postgresql",
            "dbCredentials": { "host": "db.invalid", "user": "app", "database": "app" }
        })
        .to_string(),
    )
    .unwrap();

    let server = McpServer::new(ConfigResolver::new(dir.path()));

    // db.invalid is not resolvable; the failure must be a driver error from
    // the first family, reported through the error envelope, not a crash.
    let (is_error, text) = call_tool(&server, "initialize_database", json!({})).await;
    assert!(is_error);
    assert!(text.contains("driver error") || text.contains("driver"));
}
