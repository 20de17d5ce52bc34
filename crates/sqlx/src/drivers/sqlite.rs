use super::{Driver as DriverTrait, blob};
use dbstudio_core::{Dialect, Param, Row};
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row as _, TypeInfo, ValueRef};
use std::path::Path;
use tracing::trace;

pub struct Driver;

/// Open `path`, creating it when missing, or a private in-memory database.
///
/// The in-memory database lives only as long as its connection, so that pool
/// is held to one connection that never expires.
pub async fn connect(path: Option<&Path>) -> Result<Pool<Sqlite>, sqlx::Error> {
    match path {
        Some(path) => {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await
        }
        None => {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await
        }
    }
}

impl DriverTrait for Driver {
    type Pool = Pool<Sqlite>;
    const DIALECT: Dialect = Dialect::Sqlite;

    async fn fetch_all(
        pool: &Self::Pool,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<Row>, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_sqlite(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(pool: &Self::Pool, sql: &str, params: &[Param]) -> Result<u64, sqlx::Error> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_sqlite(q, p);
        }
        Ok(q.execute(pool).await?.rows_affected())
    }
}

fn bind_sqlite<'q>(
    q: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    p: &Param,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match p {
        Param::Null => q.bind::<Option<String>>(None),
        Param::Bool(b) => q.bind(*b as i64),
        Param::Int(i) => q.bind(*i),
        Param::Float(f) => q.bind(*f),
        Param::Text(s) => q.bind(s.clone()),
    }
}

fn decode_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), decode_value(row, col.ordinal())))
        .collect()
}

// SQLite is dynamically typed: dispatch on the storage class of the value
// itself, not on the declared column type.
fn decode_value(row: &SqliteRow, i: usize) -> Value {
    let storage = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    let decoded = match storage.as_str() {
        "INTEGER" => row.try_get::<i64, _>(i).map(Value::from),
        "REAL" => row.try_get::<f64, _>(i).map(Value::from),
        "BLOB" => row.try_get::<Vec<u8>, _>(i).map(blob),
        "TEXT" => row.try_get::<String, _>(i).map(Value::from),
        _ => row
            .try_get::<i64, _>(i)
            .map(Value::from)
            .or_else(|_| row.try_get::<f64, _>(i).map(Value::from))
            .or_else(|_| row.try_get::<String, _>(i).map(Value::from)),
    };
    decoded.unwrap_or_else(|e| {
        trace!(column = i, storage = %storage, error = %e, "undecodable sqlite value");
        Value::Null
    })
}
