use super::{Driver as DriverTrait, blob};
use crate::config::NetworkOptions;
use dbstudio_core::{Dialect, Param, Row};
use serde_json::Value;
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{
    PgArguments, PgConnectOptions, PgHasArrayType, PgPoolOptions, PgRow, PgStatement, PgTypeKind,
    Postgres,
};
use sqlx::query::Query;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, Uuid};
use sqlx::{
    Column, Decode, Executor as _, Pool, Row as _, Statement as _, Type, TypeInfo, ValueRef,
};
use std::fmt::Write as _;
use tracing::trace;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

pub struct Driver;

pub async fn connect(url: Option<&str>, net: &NetworkOptions) -> Result<Pool<Postgres>, sqlx::Error> {
    if let Some(url) = url {
        return PgPoolOptions::new().connect(url).await;
    }
    let mut options = PgConnectOptions::new()
        .host(&net.host)
        .port(net.port_or(5432));
    if let Some(user) = net.user.as_deref() {
        options = options.username(user);
    }
    if let Some(password) = net.password.as_deref() {
        options = options.password(password);
    }
    if let Some(database) = net.database.as_deref() {
        options = options.database(database);
    }
    PgPoolOptions::new().connect_with(options).await
}

impl DriverTrait for Driver {
    type Pool = Pool<Postgres>;
    const DIALECT: Dialect = Dialect::Postgresql;

    // The statement is prepared without declared parameter types, so the
    // server infers them and each value is bound in the inferred form.
    async fn fetch_all(
        pool: &Self::Pool,
        sql: &str,
        params: &[Param],
    ) -> Result<Vec<Row>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let statement = (&mut *conn).prepare(sql).await?;
        let types = parameter_types(&statement);
        let rows = bind_params(statement.query(), &types, params)?
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(pool: &Self::Pool, sql: &str, params: &[Param]) -> Result<u64, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let statement = (&mut *conn).prepare(sql).await?;
        let types = parameter_types(&statement);
        let done = bind_params(statement.query(), &types, params)?
            .execute(&mut *conn)
            .await?;
        Ok(done.rows_affected())
    }
}

fn parameter_types(statement: &PgStatement<'_>) -> Vec<String> {
    statement
        .parameters()
        .and_then(|p| p.left())
        .map(|types| types.iter().map(|t| t.name().to_string()).collect())
        .unwrap_or_default()
}

fn bind_params<'q>(
    mut q: PgQuery<'q>,
    types: &[String],
    params: &[Param],
) -> Result<PgQuery<'q>, sqlx::Error> {
    for (n, p) in params.iter().enumerate() {
        q = bind_param(q, p, types.get(n).map(String::as_str))
            .map_err(|msg| sqlx::Error::Encode(format!("parameter ${}: {msg}", n + 1).into()))?;
    }
    Ok(q)
}

/// Bind `p` in the representation of the server-inferred type `ty`. Null
/// carries no payload and matches any type.
fn bind_param<'q>(q: PgQuery<'q>, p: &Param, ty: Option<&str>) -> Result<PgQuery<'q>, String> {
    let Some(ty) = ty else {
        return Ok(bind_natural(q, p));
    };
    if let Param::Null = p {
        return Ok(q.bind(None::<String>));
    }
    let mismatch = || format!("cannot bind {} as {ty}", describe(p));
    Ok(match ty {
        "BOOL" => q.bind(as_bool(p).ok_or_else(mismatch)?),
        "INT2" => q.bind(as_int::<i16>(p).ok_or_else(mismatch)?),
        "INT4" => q.bind(as_int::<i32>(p).ok_or_else(mismatch)?),
        "INT8" => q.bind(as_int::<i64>(p).ok_or_else(mismatch)?),
        "OID" => q.bind(Oid(as_int::<u32>(p).ok_or_else(mismatch)?)),
        "FLOAT4" => q.bind(as_float(p).ok_or_else(mismatch)? as f32),
        "FLOAT8" => q.bind(as_float(p).ok_or_else(mismatch)?),
        "NUMERIC" => q.bind(as_decimal(p).ok_or_else(mismatch)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => q.bind(as_text(p)),
        "JSON" | "JSONB" => q.bind(as_json(p)),
        "UUID" => q.bind(
            text(p)
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .ok_or_else(mismatch)?,
        ),
        "DATE" => q.bind(
            text(p)
                .and_then(|s| s.trim().parse::<NaiveDate>().ok())
                .ok_or_else(mismatch)?,
        ),
        "TIME" => q.bind(as_time(p).ok_or_else(mismatch)?),
        "TIMESTAMP" => q.bind(as_timestamp(p).ok_or_else(mismatch)?),
        "TIMESTAMPTZ" => q.bind(as_timestamptz(p).ok_or_else(mismatch)?),
        _ => bind_natural(q, p),
    })
}

fn bind_natural<'q>(q: PgQuery<'q>, p: &Param) -> PgQuery<'q> {
    match p {
        Param::Null => q.bind(None::<String>),
        Param::Bool(b) => q.bind(*b),
        Param::Int(i) => q.bind(*i),
        Param::Float(f) => q.bind(*f),
        Param::Text(s) => q.bind(s.clone()),
    }
}

fn describe(p: &Param) -> String {
    match p {
        Param::Text(s) => format!("'{s}'"),
        other => as_text(other),
    }
}

fn text(p: &Param) -> Option<&str> {
    match p {
        Param::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn as_text(p: &Param) -> String {
    match p {
        Param::Null => "null".to_string(),
        Param::Bool(b) => b.to_string(),
        Param::Int(i) => i.to_string(),
        Param::Float(f) => f.to_string(),
        Param::Text(s) => s.clone(),
    }
}

fn as_bool(p: &Param) -> Option<bool> {
    match p {
        Param::Bool(b) => Some(*b),
        Param::Int(0) => Some(false),
        Param::Int(1) => Some(true),
        Param::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
            "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_int<T: TryFrom<i64>>(p: &Param) -> Option<T> {
    let wide = match p {
        Param::Int(i) => *i,
        Param::Bool(b) => i64::from(*b),
        Param::Float(f) if f.fract() == 0.0 => *f as i64,
        Param::Text(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    T::try_from(wide).ok()
}

fn as_float(p: &Param) -> Option<f64> {
    match p {
        Param::Int(i) => Some(*i as f64),
        Param::Float(f) => Some(*f),
        Param::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(p: &Param) -> Option<Decimal> {
    match p {
        Param::Int(i) => Some(Decimal::from(*i)),
        Param::Float(f) => Decimal::try_from(*f).ok(),
        Param::Text(s) => {
            let s = s.trim();
            s.parse::<Decimal>()
                .ok()
                .or_else(|| Decimal::from_scientific(s).ok())
        }
        _ => None,
    }
}

fn as_json(p: &Param) -> Value {
    match p {
        Param::Null => Value::Null,
        Param::Bool(b) => Value::from(*b),
        Param::Int(i) => Value::from(*i),
        Param::Float(f) => Value::from(*f),
        Param::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
    }
}

fn as_time(p: &Param) -> Option<NaiveTime> {
    let s = text(p)?.trim();
    s.parse()
        .ok()
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M").ok())
}

fn as_timestamp(p: &Param) -> Option<NaiveDateTime> {
    let s = text(p)?.trim();
    s.parse()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| {
            s.parse::<NaiveDate>()
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// Offset-less input is taken as UTC.
fn as_timestamptz(p: &Param) -> Option<DateTime<Utc>> {
    let s = text(p)?.trim();
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z").ok())
        .map(|t| t.with_timezone(&Utc))
        .or_else(|| as_timestamp(p).map(|t| t.and_utc()))
}

fn decode_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), decode_value(row, col.ordinal())))
        .collect()
}

fn decode_value(row: &PgRow, i: usize) -> Value {
    let (type_name, is_enum) = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => {
            let ty = raw.type_info();
            (
                ty.name().to_string(),
                matches!(ty.kind(), PgTypeKind::Enum(_)),
            )
        }
        Err(_) => return Value::Null,
    };
    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(i).map(Value::from),
        "INT2" => row.try_get::<i16, _>(i).map(Value::from),
        "INT4" => row.try_get::<i32, _>(i).map(Value::from),
        "INT8" => row.try_get::<i64, _>(i).map(Value::from),
        "OID" => row.try_get::<Oid, _>(i).map(|o| Value::from(o.0)),
        "FLOAT4" => row.try_get::<f32, _>(i).map(|f| Value::from(f as f64)),
        "FLOAT8" => row.try_get::<f64, _>(i).map(Value::from),
        "NUMERIC" => row.try_get::<Decimal, _>(i).map(decimal),
        "JSON" | "JSONB" => row.try_get::<Value, _>(i),
        "UUID" => row.try_get::<Uuid, _>(i).map(|u| Value::String(u.to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(i)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(i)
            .map(|t| Value::String(t.to_string())),
        "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(i).map(timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|t| Value::String(t.to_rfc3339())),
        "INTERVAL" => row
            .try_get::<PgInterval, _>(i)
            .map(|iv| Value::String(iso_interval(&iv))),
        "BYTEA" => row.try_get::<Vec<u8>, _>(i).map(blob),
        name => match array_element(name) {
            Some(element) => decode_array(row, i, element),
            // Enum labels travel as text in either wire format.
            None if is_enum => row.try_get_unchecked::<String, _>(i).map(Value::from),
            None => row.try_get::<String, _>(i).map(Value::from),
        },
    };
    decoded.unwrap_or_else(|e| {
        trace!(column = i, type_name = %type_name, error = %e, "undecodable postgres value");
        Value::Null
    })
}

fn array_element(type_name: &str) -> Option<&str> {
    type_name
        .strip_suffix("[]")
        .or_else(|| type_name.strip_prefix('_'))
}

fn decode_array(row: &PgRow, i: usize, element: &str) -> Result<Value, sqlx::Error> {
    match element {
        "BOOL" => array::<bool>(row, i, Value::from),
        "INT2" => array::<i16>(row, i, Value::from),
        "INT4" => array::<i32>(row, i, Value::from),
        "INT8" => array::<i64>(row, i, Value::from),
        "FLOAT4" => array::<f32>(row, i, |f| Value::from(f as f64)),
        "FLOAT8" => array::<f64>(row, i, Value::from),
        "NUMERIC" => array::<Decimal>(row, i, decimal),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => array::<String>(row, i, Value::from),
        "UUID" => array::<Uuid>(row, i, |u| Value::String(u.to_string())),
        "JSONB" => array::<Value>(row, i, |v| v),
        "DATE" => array::<NaiveDate>(row, i, |d| Value::String(d.to_string())),
        "TIMESTAMP" => array::<NaiveDateTime>(row, i, timestamp),
        "TIMESTAMPTZ" => array::<DateTime<Utc>>(row, i, |t| Value::String(t.to_rfc3339())),
        other => Err(sqlx::Error::Decode(
            format!("unsupported array element type {other}").into(),
        )),
    }
}

fn array<T>(row: &PgRow, i: usize, item: impl Fn(T) -> Value) -> Result<Value, sqlx::Error>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType,
{
    let items = row.try_get::<Vec<Option<T>>, _>(i)?;
    Ok(Value::Array(
        items
            .into_iter()
            .map(|v| v.map_or(Value::Null, &item))
            .collect(),
    ))
}

// NUMERIC keeps its exact digits as a string rather than rounding through f64.
fn decimal(d: Decimal) -> Value {
    Value::String(d.to_string())
}

fn timestamp(t: NaiveDateTime) -> Value {
    Value::String(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`.
fn iso_interval(iv: &PgInterval) -> String {
    let mut out = String::from("P");
    let (years, months) = (iv.months / 12, iv.months % 12);
    if years != 0 {
        let _ = write!(out, "{years}Y");
    }
    if months != 0 {
        let _ = write!(out, "{months}M");
    }
    if iv.days != 0 {
        let _ = write!(out, "{}D", iv.days);
    }
    if iv.microseconds != 0 {
        out.push('T');
        let sign = if iv.microseconds < 0 { "-" } else { "" };
        let micros = iv.microseconds.unsigned_abs();
        let (hours, rest) = (micros / 3_600_000_000, micros % 3_600_000_000);
        let (minutes, rest) = (rest / 60_000_000, rest % 60_000_000);
        let (seconds, fraction) = (rest / 1_000_000, rest % 1_000_000);
        if hours != 0 {
            let _ = write!(out, "{sign}{hours}H");
        }
        if minutes != 0 {
            let _ = write!(out, "{sign}{minutes}M");
        }
        if seconds != 0 || fraction != 0 {
            let _ = write!(out, "{sign}{seconds}");
            if fraction != 0 {
                let digits = format!("{fraction:06}");
                let _ = write!(out, ".{}", digits.trim_end_matches('0'));
            }
            out.push('S');
        }
    }
    if out == "P" {
        out.push_str("T0S");
    }
    out
}
