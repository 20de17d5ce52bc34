//! Per-dialect introspection SQL.
//!
//! Table names are interpolated into the describe-columns text rather than
//! bound, because `PRAGMA table_info` does not accept parameters. The name is
//! rendered as a quoted literal, and callers are expected to check it against
//! the current table list first (see `ActionGateway::get_table_info`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// SQL backend family. Fixed for the lifetime of a database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQLite and wire-compatible forks.
    Sqlite,
    Postgresql,
    Mysql,
}

/// The two introspection templates for one dialect.
#[derive(Clone, Copy)]
pub struct QueryTable {
    pub list_tables: &'static str,
    pub describe_columns: fn(&str) -> String,
}

impl fmt::Debug for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTable")
            .field("list_tables", &self.list_tables)
            .finish_non_exhaustive()
    }
}

const SQLITE_LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";

const POSTGRES_LIST_TABLES: &str = "SELECT table_name::text AS name \
     FROM information_schema.tables \
     WHERE table_schema = 'public'";

const MYSQL_LIST_TABLES: &str = "SELECT table_name AS name \
     FROM information_schema.tables \
     WHERE table_schema = DATABASE()";

fn sqlite_describe_columns(table: &str) -> String {
    format!("PRAGMA table_info({})", quote_literal(table, false))
}

fn postgres_describe_columns(table: &str) -> String {
    format!(
        "SELECT column_name::text AS name, data_type::text AS type, is_nullable::text AS is_nullable \
         FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = {} \
         ORDER BY ordinal_position",
        quote_literal(table, false)
    )
}

fn mysql_describe_columns(table: &str) -> String {
    format!(
        "SELECT column_name AS name, data_type AS type, is_nullable AS is_nullable \
         FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = {} \
         ORDER BY ordinal_position",
        quote_literal(table, true)
    )
}

/// Render `value` as a single-quoted SQL string literal.
/// MySQL treats backslash as an escape inside literals by default, so it is doubled too.
fn quote_literal(value: &str, escape_backslash: bool) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' if escape_backslash => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Sqlite, Dialect::Postgresql, Dialect::Mysql];

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Mysql => "mysql",
        }
    }

    pub fn queries(self) -> QueryTable {
        match self {
            Dialect::Sqlite => QueryTable {
                list_tables: SQLITE_LIST_TABLES,
                describe_columns: sqlite_describe_columns,
            },
            Dialect::Postgresql => QueryTable {
                list_tables: POSTGRES_LIST_TABLES,
                describe_columns: postgres_describe_columns,
            },
            Dialect::Mysql => QueryTable {
                list_tables: MYSQL_LIST_TABLES,
                describe_columns: mysql_describe_columns,
            },
        }
    }

    /// Whether the backend resolves table names without regard to ASCII case.
    /// MySQL does so when `lower_case_table_names` is set, which callers
    /// cannot see, so it is treated as folding.
    pub fn folds_table_case(self) -> bool {
        matches!(self, Dialect::Sqlite | Dialect::Mysql)
    }

    pub fn list_tables_sql(self) -> &'static str {
        self.queries().list_tables
    }

    pub fn describe_columns_sql(self, table: &str) -> String {
        (self.queries().describe_columns)(table)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid database type: {0}. Must be one of: sqlite, postgresql, mysql")]
pub struct ParseDialectError(pub String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            "mysql" => Ok(Dialect::Mysql),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}
