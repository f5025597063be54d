use std::sync::Arc;

use serde::Deserialize;

use crate::dialect::{self, DefaultDialect, Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
use crate::error::DatabaseError;

/// Connection configuration for the database facade.
///
/// The pool itself is created by the backend crate; this only carries the
/// settings every backend needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Dialect name override; auto-detected from the URL when absent.
    #[serde(default)]
    pub dialect: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        DatabaseConfig {
            url: url.into(),
            dialect: None,
            max_connections: default_max_connections(),
        }
    }

    /// Read the configuration from the environment (`DATABASE_URL`,
    /// `DATABASE_DIALECT`, `DATABASE_MAX_CONNECTIONS`), loading a `.env`
    /// file first. `.env` never overwrites already-set variables.
    pub fn from_env() -> Result<Self, DatabaseError> {
        let _ = dotenvy::dotenv();
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::Configuration("DATABASE_URL is not set".to_string())
        })?;
        let dialect = std::env::var("DATABASE_DIALECT").ok();
        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| {
                DatabaseError::Configuration(format!("invalid DATABASE_MAX_CONNECTIONS: {raw}"))
            })?,
            Err(_) => default_max_connections(),
        };
        Ok(DatabaseConfig {
            url,
            dialect,
            max_connections,
        })
    }

    /// Resolve the dialect: explicit name override, else URL detection.
    pub fn resolve_dialect(&self) -> Result<Arc<dyn Dialect>, DatabaseError> {
        match self.dialect.as_deref() {
            None => Ok(dialect::detect(&self.url)),
            Some("postgresql") | Some("postgres") => Ok(Arc::new(PostgresDialect)),
            Some("mysql") => Ok(Arc::new(MySqlDialect)),
            Some("sqlite") => Ok(Arc::new(SqliteDialect)),
            Some("generic") => Ok(Arc::new(DefaultDialect)),
            Some(other) => Err(DatabaseError::Configuration(format!(
                "unknown dialect `{other}`"
            ))),
        }
    }
}
