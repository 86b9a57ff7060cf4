//! Error types for the dispatcher and runner.

use drizzle_adapter::AdapterError;
use drizzle_core::ConfigError;
use thiserror::Error;

/// Errors raised inside tool and resource handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed tool arguments (wrong type, bad migration-name pattern).
    #[error("invalid arguments: {0}")]
    Validation(String),

    /// Tool name not in the static registry.
    #[error("tool not found: {0}")]
    UnknownTool(String),

    /// Resource URI not in the static registry.
    #[error("resource not found: {0}")]
    UnknownResource(String),

    /// drizzle-kit exited non-zero.
    #[error("drizzle-kit {verb} failed ({status}): {stderr}")]
    Subprocess {
        verb: &'static str,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
