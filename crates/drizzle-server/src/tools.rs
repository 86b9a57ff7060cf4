//! Static tool declarations.
//!
//! Five tools, declared once. Argument checks are field presence/type/
//! pattern checks; anything deeper is the caller's responsibility.

use crate::protocol::ToolDefinition;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

pub const GENERATE_MIGRATION: &str = "drizzle_generate_migration";
pub const RUN_MIGRATIONS: &str = "drizzle_run_migrations";
pub const INTROSPECT_SCHEMA: &str = "drizzle_introspect_schema";
pub const EXECUTE_QUERY: &str = "execute_query";
pub const INITIALIZE_DATABASE: &str = "initialize_database";

pub const MIGRATION_NAME_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

/// Compiled migration-name pattern; names are validated before any
/// subprocess is spawned.
pub static MIGRATION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(MIGRATION_NAME_PATTERN).expect("migration name pattern must compile")
});

fn config_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Path to a drizzle config file (defaults to auto-discovery in the working directory)"
    })
}

/// All tool definitions, in the order they are listed to clients.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GENERATE_MIGRATION.to_string(),
            description: Some(
                "Generate SQL migration files from the drizzle schema".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "pattern": MIGRATION_NAME_PATTERN,
                        "description": "Name for the generated migration"
                    },
                    "config": config_property(),
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: RUN_MIGRATIONS.to_string(),
            description: Some("Apply pending migrations to the database".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": { "config": config_property() }
            }),
        },
        ToolDefinition {
            name: INTROSPECT_SCHEMA.to_string(),
            description: Some(
                "Introspect the existing database into a drizzle schema".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": { "config": config_property() }
            }),
        },
        ToolDefinition {
            name: EXECUTE_QUERY.to_string(),
            description: Some(
                "Execute a SQL query against the configured database".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "SQL to execute" },
                    "params": {
                        "type": "array",
                        "items": { "type": "string" },
                        "default": [],
                        "description": "Positional query parameters"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: INITIALIZE_DATABASE.to_string(),
            description: Some(
                "Open the database connection described by the drizzle config".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": { "config": config_property() }
            }),
        },
    ]
}
