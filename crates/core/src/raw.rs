//! Arbitrary SQL execution. The SQL text is not inspected; binding is left to
//! the handle.

use crate::error::{Error, Result};
use crate::handle::{DatabaseHandle, Param, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// `params` as callers send it: a bare scalar or a sequence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamsInput {
    Many(Vec<Param>),
    One(Param),
}

/// Scalar becomes a one-element sequence, absent becomes empty.
pub fn normalize_params(input: Option<ParamsInput>) -> Vec<Param> {
    match input {
        None => Vec::new(),
        Some(ParamsInput::One(p)) => vec![p],
        Some(ParamsInput::Many(ps)) => ps,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawQuery {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub params: Option<ParamsInput>,
}

impl RawQuery {
    /// Build from decoded query-string pairs. `params` may repeat, or be a
    /// single JSON array; each value binds as a JSON scalar when it parses as
    /// one and as text otherwise.
    pub fn from_query_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sql = None;
        let mut values: Vec<&str> = Vec::new();
        for (key, value) in pairs {
            match key {
                "sql" => sql = Some(value.to_string()),
                "params" | "params[]" => values.push(value),
                _ => {}
            }
        }

        let params = match values.as_slice() {
            [] | [""] => None,
            [single] => match serde_json::from_str::<Vec<Param>>(single) {
                Ok(list) => Some(ParamsInput::Many(list)),
                Err(_) => Some(ParamsInput::One(query_value(single))),
            },
            many => Some(ParamsInput::Many(
                many.iter().map(|v| query_value(v)).collect(),
            )),
        };

        Self { sql, params }
    }

    pub fn into_parts(self) -> (Option<String>, Vec<Param>) {
        (self.sql, normalize_params(self.params))
    }
}

fn query_value(raw: &str) -> Param {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => Param::Null,
        Ok(Value::Bool(b)) => Param::Bool(b),
        Ok(Value::Number(n)) => match n.as_i64() {
            Some(i) => Param::Int(i),
            None => n
                .as_f64()
                .map(Param::Float)
                .unwrap_or_else(|| Param::Text(raw.to_string())),
        },
        _ => Param::Text(raw.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsResponse {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn require_sql(sql: Option<&str>) -> Result<&str> {
    match sql {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(Error::invalid_request("SQL query is required")),
    }
}

pub struct RawGateway<H> {
    handle: Arc<H>,
}

impl<H> Clone for RawGateway<H> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<H: DatabaseHandle> RawGateway<H> {
    pub fn new(handle: Arc<H>) -> Self {
        Self { handle }
    }

    /// Run a read statement and return every row verbatim.
    pub async fn execute_read(&self, sql: Option<&str>, params: &[Param]) -> Result<RowsResponse> {
        let sql = require_sql(sql)?;
        debug!(dialect = %self.handle.dialect(), params = params.len(), "raw read");
        let rows = self.handle.prepare(sql).all(params).await?;
        Ok(RowsResponse { rows })
    }

    /// Run a mutating statement. Any backend failure is returned as an error,
    /// so `success` is only ever reported from a completed execution.
    pub async fn execute_write(
        &self,
        sql: Option<&str>,
        params: &[Param],
    ) -> Result<SuccessResponse> {
        let sql = require_sql(sql)?;
        debug!(dialect = %self.handle.dialect(), params = params.len(), "raw write");
        let outcome = self.handle.prepare(sql).run(params).await?;
        Ok(SuccessResponse {
            success: outcome.success,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> RawQuery {
        RawQuery::from_query_pairs(pairs.iter().copied())
    }

    #[test]
    fn scalar_and_sequence_params_normalize() {
        assert_eq!(normalize_params(None), Vec::<Param>::new());
        let one: RawQuery = serde_json::from_str(r#"{"sql": "x", "params": 5}"#).unwrap();
        assert_eq!(one.into_parts().1, vec![Param::Int(5)]);
        let many: RawQuery = serde_json::from_str(r#"{"sql": "x", "params": [5, "a"]}"#).unwrap();
        assert_eq!(many.into_parts().1, vec![Param::Int(5), Param::Text("a".into())]);
        let null: RawQuery = serde_json::from_str(r#"{"sql": "x", "params": null}"#).unwrap();
        assert!(null.into_parts().1.is_empty());
    }

    #[test]
    fn query_string_params() {
        let (sql, params) = query(&[("sql", "SELECT ?"), ("params", "5")]).into_parts();
        assert_eq!(sql.as_deref(), Some("SELECT ?"));
        assert_eq!(params, vec![Param::Int(5)]);

        let (_, params) = query(&[("sql", "q"), ("params", "[5,6]")]).into_parts();
        assert_eq!(params, vec![Param::Int(5), Param::Int(6)]);

        let (_, params) = query(&[("sql", "q"), ("params", "a"), ("params", "1.5")]).into_parts();
        assert_eq!(params, vec![Param::Text("a".into()), Param::Float(1.5)]);

        let (_, params) = query(&[("sql", "q"), ("params", "007")]).into_parts();
        assert_eq!(params, vec![Param::Text("007".into())]);

        let (_, params) = query(&[("sql", "q"), ("params", "")]).into_parts();
        assert!(params.is_empty());
    }

    #[test]
    fn blank_sql_is_rejected() {
        for sql in [None, Some(""), Some("   ")] {
            assert!(matches!(require_sql(sql), Err(Error::InvalidRequest(_))));
        }
    }
}
