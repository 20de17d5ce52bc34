pub mod mysql;
pub mod postgres;
pub mod sqlite;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use dbstudio_core::{Dialect, Param, Row};
use serde_json::Value;
use std::future::Future;

/// Binding and row shaping for one sqlx backend.
pub trait Driver: Send + Sync + 'static {
    type Pool: Clone + Send + Sync + 'static;
    const DIALECT: Dialect;

    fn fetch_all(
        pool: &Self::Pool,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<Vec<Row>, sqlx::Error>> + Send;

    /// Returns the number of affected rows.
    fn execute(
        pool: &Self::Pool,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

pub(crate) fn blob(bytes: Vec<u8>) -> Value {
    Value::String(STANDARD.encode(bytes))
}
