//! # drizzle-server
//!
//! MCP (Model Context Protocol) server for drizzle schema management.
//!
//! The server exposes five tools (migration generate/run/introspect, raw
//! query execution, database initialization) and two readable resources
//! (`database://tables`, `database://schema`) over a line-delimited
//! JSON-RPC stdio transport.
//!
//! ```text
//! AI Agent
//!     │
//!     │ MCP protocol (list tools / call tool / read resource)
//!     ▼
//! ┌──────────────────┐
//! │ drizzle-mcp      │
//! │ 1. Resolve config│  ← drizzle-core
//! │ 2. Route tool    │
//! │ 3a. drizzle-kit  │  ← subprocess (generate/migrate/introspect)
//! │ 3b. SQL          │  ← drizzle-adapter (execute_query, resources)
//! │ 4. Wrap result   │
//! └────────┬─────────┘
//!          │
//!          ▼
//!   sqlite / postgresql
//! ```

pub mod context;
pub mod error;
pub mod protocol;
pub mod resources;
pub mod runner;
pub mod server;
pub mod tools;

pub use context::ServerContext;
pub use error::ServerError;
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ResourceDefinition,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
