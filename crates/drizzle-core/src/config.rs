//! Drizzle configuration model.
//!
//! A drizzle config is the default export of a `drizzle.config.{ts,js,mjs}`
//! module (or a plain `drizzle.config.json` object). Only `dialect` and
//! `dbCredentials` are interpreted here; everything else (`schema`, `out`,
//! custom keys) is preserved verbatim for drizzle-kit to consume.

use crate::error::{ConfigError, ConfigIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported database engine families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Postgresql,
}

impl Dialect {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
        }
    }

    /// Parse a dialect string from a config file. Unrecognized values are a
    /// validation failure, not a fallback.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sqlite" => Some(Self::Sqlite),
            "postgresql" => Some(Self::Postgresql),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Database credentials: either a full connection string (`url`) or the
/// parts needed to synthesize one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// A validated drizzle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrizzleConfig {
    /// Raw dialect string as written in the config file. Use [`Self::dialect`]
    /// for the typed value; validation guarantees it parses.
    pub dialect: String,

    #[serde(default)]
    pub db_credentials: DbCredentials,

    /// Schema file location hint, passed through uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// Migration output directory hint, passed through uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<String>,

    /// Any remaining config keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DrizzleConfig {
    /// Deserialize and validate a config object. Shape errors and invariant
    /// violations both surface as [`ConfigError::Invalid`] with field-level
    /// issues.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::invalid(vec![ConfigIssue::new("", e.to_string())]))?;

        let issues = config.validate();
        if issues.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::invalid(issues))
        }
    }

    /// The typed dialect, if the raw string is a recognized value.
    pub fn dialect(&self) -> Option<Dialect> {
        Dialect::parse(&self.dialect)
    }

    /// Check field types and the credential invariant. Returns one issue per
    /// violation; an empty list means the config is valid.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let dialect = match Dialect::parse(&self.dialect) {
            Some(d) => d,
            None => {
                issues.push(ConfigIssue::new(
                    "dialect",
                    format!(
                        "unsupported dialect `{}` (expected `sqlite` or `postgresql`)",
                        self.dialect
                    ),
                ));
                return issues;
            }
        };

        let creds = &self.db_credentials;
        match dialect {
            Dialect::Sqlite => {
                if creds.url.as_deref().is_none_or(str::is_empty) {
                    issues.push(ConfigIssue::new(
                        "dbCredentials.url",
                        "sqlite requires a database file path in `url`",
                    ));
                }
            }
            Dialect::Postgresql => {
                if creds.url.is_none() {
                    for (field, value) in [
                        ("host", &creds.host),
                        ("user", &creds.user),
                        ("database", &creds.database),
                    ] {
                        if value.as_deref().is_none_or(str::is_empty) {
                            issues.push(ConfigIssue::new(
                                format!("dbCredentials.{field}"),
                                format!("postgresql requires `url` or `{field}`"),
                            ));
                        }
                    }
                }
            }
        }

        issues
    }
}
