use dbstudio_core::Dialect;
use std::fmt;
use std::path::PathBuf;

/// Server-style connection settings shared by PostgreSQL and MySQL.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkOptions {
    pub host: String,
    /// Falls back to the dialect's default port.
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            user: None,
            password: None,
            database: None,
        }
    }
}

impl NetworkOptions {
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }
}

impl fmt::Debug for NetworkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// `None` opens a private in-memory database.
    Sqlite { path: Option<PathBuf> },
    /// For both server dialects a URL, when given, takes precedence over the
    /// discrete options.
    Postgres {
        url: Option<String>,
        options: NetworkOptions,
    },
    Mysql {
        url: Option<String>,
        options: NetworkOptions,
    },
}

impl ConnectionConfig {
    pub fn sqlite_in_memory() -> Self {
        ConnectionConfig::Sqlite { path: None }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            ConnectionConfig::Sqlite { .. } => Dialect::Sqlite,
            ConnectionConfig::Postgres { .. } => Dialect::Postgresql,
            ConnectionConfig::Mysql { .. } => Dialect::Mysql,
        }
    }
}
