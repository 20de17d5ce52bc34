use super::{Driver as DriverTrait, blob};
use crate::config::NetworkOptions;
use dbstudio_core::{Dialect, Param, Row};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::types::Decimal;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Column, Pool, Row as _, TypeInfo, ValueRef};
use tracing::trace;

pub struct Driver;

pub async fn connect(url: Option<&str>, net: &NetworkOptions) -> Result<Pool<MySql>, sqlx::Error> {
    if let Some(url) = url {
        return MySqlPoolOptions::new().connect(url).await;
    }
    let mut options = MySqlConnectOptions::new()
        .host(&net.host)
        .port(net.port_or(3306));
    if let Some(user) = net.user.as_deref() {
        options = options.username(user);
    }
    if let Some(password) = net.password.as_deref() {
        options = options.password(password);
    }
    if let Some(database) = net.database.as_deref() {
        options = options.database(database);
    }
    MySqlPoolOptions::new().connect_with(options).await
}

impl DriverTrait for Driver {
    type Pool = Pool<MySql>;
    const DIALECT: Dialect = Dialect::Mysql;

    async fn fetch_all(
        pool: &Self::Pool,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<Row>, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_mysql(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(pool: &Self::Pool, sql: &str, params: &[Param]) -> Result<u64, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_mysql(q, p);
        }
        Ok(q.execute(pool).await?.rows_affected())
    }
}

fn bind_mysql<'q>(
    q: sqlx::query::Query<'q, MySql, MySqlArguments>,
    p: &Param,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match p {
        Param::Null => q.bind::<Option<String>>(None),
        Param::Bool(b) => q.bind(*b),
        Param::Int(i) => q.bind(*i),
        Param::Float(f) => q.bind(*f),
        Param::Text(s) => q.bind(s.clone()),
    }
}

fn decode_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), decode_value(row, col.ordinal())))
        .collect()
}

fn decode_value(row: &MySqlRow, i: usize) -> Value {
    let type_name = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    let decoded = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(i).map(Value::from),
        t if t.ends_with("UNSIGNED") => row.try_get::<u64, _>(i).map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(i).map(Value::from)
        }
        "FLOAT" => row.try_get::<f32, _>(i).map(|f| Value::from(f as f64)),
        "DOUBLE" => row.try_get::<f64, _>(i).map(Value::from),
        // Digits beyond what `Decimal` holds still arrive as text.
        "DECIMAL" => row
            .try_get::<Decimal, _>(i)
            .map(|d| Value::String(d.to_string()))
            .or_else(|_| row.try_get_unchecked::<String, _>(i).map(Value::from)),
        "YEAR" => row.try_get_unchecked::<u16, _>(i).map(Value::from),
        "JSON" => row.try_get::<Value, _>(i),
        "DATE" => row
            .try_get::<NaiveDate, _>(i)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(i)
            .map(|t| Value::String(t.to_string())),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(i)
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|t| Value::String(t.to_rfc3339())),
        "BINARY" | "VARBINARY" | "BIT" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB"
        | "GEOMETRY" => row.try_get::<Vec<u8>, _>(i).map(blob),
        _ => row
            .try_get::<String, _>(i)
            .or_else(|_| row.try_get_unchecked::<String, _>(i))
            .map(Value::from),
    };
    decoded.unwrap_or_else(|e| {
        trace!(column = i, type_name = %type_name, error = %e, "undecodable mysql value");
        Value::Null
    })
}
