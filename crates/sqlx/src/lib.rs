//! sqlx-backed [`DatabaseHandle`] for SQLite, PostgreSQL and MySQL.
//!
//! One pool per process, opened at startup from a [`ConnectionConfig`]. The
//! pool decides how many statements run concurrently.

pub mod config;
pub mod drivers;

pub use config::{ConnectionConfig, NetworkOptions};

use dbstudio_core::{BackendError, DatabaseHandle, Dialect, Param, Row, RunOutcome};
use drivers::Driver as _;
use sqlx::{MySql, Pool, Postgres, Sqlite};
use tracing::{debug, info, trace};

enum DbPool {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
    Mysql(Pool<MySql>),
}

pub struct SqlxHandle {
    pool: DbPool,
}

impl SqlxHandle {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, sqlx::Error> {
        let pool = match config {
            ConnectionConfig::Sqlite { path } => {
                DbPool::Sqlite(drivers::sqlite::connect(path.as_deref()).await?)
            }
            ConnectionConfig::Postgres { url, options } => {
                DbPool::Postgres(drivers::postgres::connect(url.as_deref(), options).await?)
            }
            ConnectionConfig::Mysql { url, options } => {
                DbPool::Mysql(drivers::mysql::connect(url.as_deref(), options).await?)
            }
        };
        info!(dialect = %config.dialect(), "database connected");
        Ok(Self { pool })
    }

    pub async fn sqlite_in_memory() -> Result<Self, sqlx::Error> {
        Self::connect(&ConnectionConfig::sqlite_in_memory()).await
    }

    pub async fn close(&self) {
        match &self.pool {
            DbPool::Sqlite(p) => p.close().await,
            DbPool::Postgres(p) => p.close().await,
            DbPool::Mysql(p) => p.close().await,
        }
    }
}

/// Keep the backend's message and, when present, its error code.
pub fn backend_error(err: sqlx::Error) -> BackendError {
    match &err {
        sqlx::Error::Database(db) => {
            let out = BackendError::new(db.message());
            match db.code() {
                Some(code) => out.with_code(code),
                None => out,
            }
        }
        _ => BackendError::new(err.to_string()),
    }
}

impl DatabaseHandle for SqlxHandle {
    fn dialect(&self) -> Dialect {
        match self.pool {
            DbPool::Sqlite(_) => drivers::sqlite::Driver::DIALECT,
            DbPool::Postgres(_) => drivers::postgres::Driver::DIALECT,
            DbPool::Mysql(_) => drivers::mysql::Driver::DIALECT,
        }
    }

    async fn fetch_all(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, BackendError> {
        debug!(dialect = %self.dialect(), sql, params = params.len(), "fetch_all");
        let rows = match &self.pool {
            DbPool::Sqlite(p) => drivers::sqlite::Driver::fetch_all(p, sql, params).await,
            DbPool::Postgres(p) => drivers::postgres::Driver::fetch_all(p, sql, params).await,
            DbPool::Mysql(p) => drivers::mysql::Driver::fetch_all(p, sql, params).await,
        }
        .map_err(backend_error)?;
        trace!(rows = rows.len(), "fetch_all done");
        Ok(rows)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> Result<RunOutcome, BackendError> {
        debug!(dialect = %self.dialect(), sql, params = params.len(), "execute");
        let rows_affected = match &self.pool {
            DbPool::Sqlite(p) => drivers::sqlite::Driver::execute(p, sql, params).await,
            DbPool::Postgres(p) => drivers::postgres::Driver::execute(p, sql, params).await,
            DbPool::Mysql(p) => drivers::mysql::Driver::execute(p, sql, params).await,
        }
        .map_err(backend_error)?;
        trace!(rows_affected, "execute done");
        Ok(RunOutcome {
            success: true,
            rows_affected,
        })
    }
}
