use crate::error::{Error, Result};
use crate::handle::DatabaseHandle;
use crate::normalize::{self, ColumnDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Request body accepted by the action endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
}

/// The closed set of named operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    GetTables,
    GetTableInfo { table: String },
}

impl TryFrom<ActionRequest> for Action {
    type Error = Error;

    fn try_from(req: ActionRequest) -> Result<Self> {
        let action = match req.action.as_deref() {
            None | Some("") => return Err(Error::invalid_request("Action is required")),
            Some(a) => a,
        };
        match action {
            "getTables" => Ok(Action::GetTables),
            "getTableInfo" => match req.table {
                Some(table) if !table.is_empty() => Ok(Action::GetTableInfo { table }),
                _ => Err(Error::invalid_request("Table name is required")),
            },
            other => Err(Error::invalid_request(format!("Unknown action: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse {
    Tables { tables: Vec<String> },
    Columns { columns: Vec<ColumnDescriptor> },
}

pub struct ActionGateway<H> {
    handle: Arc<H>,
}

impl<H> Clone for ActionGateway<H> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<H: DatabaseHandle> ActionGateway<H> {
    pub fn new(handle: Arc<H>) -> Self {
        Self { handle }
    }

    /// Validate the request and run the named action.
    pub async fn dispatch(&self, req: ActionRequest) -> Result<ActionResponse> {
        match Action::try_from(req)? {
            Action::GetTables => Ok(ActionResponse::Tables {
                tables: self.get_tables().await?,
            }),
            Action::GetTableInfo { table } => Ok(ActionResponse::Columns {
                columns: self.get_table_info(&table).await?,
            }),
        }
    }

    pub async fn get_tables(&self) -> Result<Vec<String>> {
        let dialect = self.handle.dialect();
        let rows = self.handle.prepare(dialect.list_tables_sql()).all(&[]).await?;
        normalize::table_names(dialect, &rows)
    }

    /// Describe the columns of `table`.
    ///
    /// The name ends up inside SQL text, so it must match a table the backend
    /// just listed; anything else is rejected before the describe query runs.
    /// On dialects that fold table case, a match ignoring ASCII case counts
    /// and the listed spelling is the one described.
    pub async fn get_table_info(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        if table.is_empty() {
            return Err(Error::invalid_request("Table name is required"));
        }
        let dialect = self.handle.dialect();
        let known = self.get_tables().await?;
        let listed = known.iter().find(|t| t.as_str() == table).or_else(|| {
            known
                .iter()
                .find(|t| dialect.folds_table_case() && t.eq_ignore_ascii_case(table))
        });
        let Some(listed) = listed else {
            return Err(Error::invalid_request(format!("Unknown table: {table}")));
        };

        let sql = dialect.describe_columns_sql(listed);
        debug!(%dialect, table = %listed, "describe table");
        let rows = self.handle.prepare(&sql).all(&[]).await?;
        normalize::columns(dialect, &rows)
    }
}
