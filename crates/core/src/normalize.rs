//! Reshapes dialect-specific introspection rows into one representation.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::handle::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Native type name as reported by the backend.
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

// MySQL may upper-case information_schema labels, so fall back to a case-insensitive match.
fn field<'r>(row: &'r Row, key: &str) -> Option<&'r Value> {
    row.get(key).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn string_field(row: &Row, dialect: Dialect, key: &'static str) -> Result<String> {
    match field(row, key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(Error::MalformedRow {
            dialect,
            field: key,
        }),
    }
}

/// Extract the `name` column from list-tables rows.
pub fn table_names(dialect: Dialect, rows: &[Row]) -> Result<Vec<String>> {
    rows.iter()
        .map(|row| string_field(row, dialect, "name"))
        .collect()
}

pub fn columns(dialect: Dialect, rows: &[Row]) -> Result<Vec<ColumnDescriptor>> {
    rows.iter().map(|row| column(dialect, row)).collect()
}

fn column(dialect: Dialect, row: &Row) -> Result<ColumnDescriptor> {
    let name = string_field(row, dialect, "name")?;
    match dialect {
        Dialect::Sqlite => {
            let data_type = match field(row, "type") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::String(_)) | Some(Value::Null) => "TEXT".to_string(),
                _ => {
                    return Err(Error::MalformedRow {
                        dialect,
                        field: "type",
                    });
                }
            };
            let notnull = match field(row, "notnull") {
                Some(Value::Number(n)) => n.as_i64().ok_or(Error::MalformedRow {
                    dialect,
                    field: "notnull",
                })?,
                Some(Value::Bool(b)) => *b as i64,
                _ => {
                    return Err(Error::MalformedRow {
                        dialect,
                        field: "notnull",
                    });
                }
            };
            Ok(ColumnDescriptor {
                name,
                data_type,
                nullable: notnull == 0,
            })
        }
        Dialect::Postgresql | Dialect::Mysql => {
            let data_type = string_field(row, dialect, "type")?;
            let is_nullable = string_field(row, dialect, "is_nullable")?;
            Ok(ColumnDescriptor {
                name,
                data_type,
                nullable: is_nullable == "YES",
            })
        }
    }
}
