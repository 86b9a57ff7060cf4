//! # drizzle-core
//!
//! Configuration model and resolver shared by the drizzle-mcp crates.
//!
//! A config describes one target database: its dialect (`sqlite` or
//! `postgresql`), credentials, and the schema/migration location hints that
//! drizzle-kit consumes. [`ConfigResolver`] finds the config file next to
//! the working directory, evaluates it, validates the credential invariant,
//! and caches the result per resolved path.

pub mod config;
pub mod error;
pub mod resolver;

pub use config::{DbCredentials, Dialect, DrizzleConfig};
pub use error::{ConfigError, ConfigIssue};
pub use resolver::{ConfigResolver, LoadedConfig, CONFIG_CANDIDATES};
