//! Error types for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// A single validation failure, tied to the config field that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path to the offending field, e.g. `dbCredentials.url`.
    pub path: String,
    pub reason: String,
}

impl ConfigIssue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Errors that can occur while resolving or validating a drizzle config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the explicit path nor any conventional filename exists.
    #[error("no drizzle config found (tried: {})", format_paths(.attempted))]
    NotFound { attempted: Vec<PathBuf> },

    /// The loaded config object does not satisfy the schema constraints.
    #[error("invalid drizzle config: {}", format_issues(.issues))]
    Invalid { issues: Vec<ConfigIssue> },

    /// Evaluating the config module failed (node missing, module threw,
    /// or the default export was not serializable).
    #[error("failed to evaluate config module {path}: {reason}")]
    Eval { path: PathBuf, reason: String },

    /// A directory/config accessor was called before any successful load.
    #[error("no drizzle config has been loaded yet")]
    NotLoaded,

    /// Filesystem error while probing or reading config files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid(issues: Vec<ConfigIssue>) -> Self {
        Self::Invalid { issues }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
