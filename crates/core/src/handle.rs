use crate::dialect::Dialect;
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// One result row, keyed by column name. The shape is backend-determined.
pub type Row = Map<String, Value>;

/// A positional bind parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub rows_affected: u64,
}

/// The capability the gateways need from a database: a dialect tag and
/// prepare-and-execute over SQL text with positional parameters.
///
/// Implementations decide how parameters bind and how concurrent calls are
/// scheduled; nothing above this trait adds locking.
pub trait DatabaseHandle: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;

    fn fetch_all(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<Vec<Row>, BackendError>> + Send;

    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = Result<RunOutcome, BackendError>> + Send;

    fn prepare<'h>(&'h self, sql: &'h str) -> Statement<'h, Self>
    where
        Self: Sized,
    {
        Statement { handle: self, sql }
    }
}

/// SQL text bound to a handle, ready to run with parameters.
pub struct Statement<'h, H> {
    handle: &'h H,
    sql: &'h str,
}

impl<'h, H: DatabaseHandle> Statement<'h, H> {
    pub async fn all(&self, params: &[Param]) -> Result<Vec<Row>, BackendError> {
        self.handle.fetch_all(self.sql, params).await
    }

    pub async fn run(&self, params: &[Param]) -> Result<RunOutcome, BackendError> {
        self.handle.execute(self.sql, params).await
    }
}
