//! Static resource declarations.

use crate::protocol::ResourceDefinition;

pub const TABLES_URI: &str = "database://tables";
pub const SCHEMA_URI: &str = "database://schema";

/// Both readable resources, in the order they are listed to clients.
pub fn definitions() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition {
            uri: TABLES_URI.to_string(),
            name: "Database tables".to_string(),
            description: Some("List of tables in the connected database".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceDefinition {
            uri: SCHEMA_URI.to_string(),
            name: "Database schema".to_string(),
            description: Some("Per-table DDL for the connected database".to_string()),
            mime_type: Some("application/json".to_string()),
        },
    ]
}
