use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use vecscope_core::{Result, VecscopeError};

/// Connection parameters for a PostgreSQL database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for PgConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            max_connections: 5,
        }
    }
}

impl PgConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(VecscopeError::Config("host must not be empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(VecscopeError::Config(
                "database must not be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(VecscopeError::Config(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection options; the password is passed through without URL encoding.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Open a connection pool.
    pub async fn connect(&self) -> Result<PgPool> {
        self.validate()?;
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                VecscopeError::Database(format!(
                    "failed to connect to {}:{}/{}: {e}",
                    self.host, self.port, self.database
                ))
            })
    }
}

impl fmt::Debug for PgConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_local_server() {
        let config = PgConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn debug_hides_password() {
        let config = PgConnectionConfig::new("db", 5433, "reader", "hunter2", "vectors");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("vectors"));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(PgConnectionConfig::default()
            .with_max_connections(0)
            .validate()
            .is_err());
        let mut config = PgConnectionConfig::default();
        config.database = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: PgConnectionConfig =
            serde_json::from_str(r#"{"host": "pg.internal", "database": "embeddings"}"#).unwrap();
        assert_eq!(config.host, "pg.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.user, "postgres");
    }
}
