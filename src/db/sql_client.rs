//! Raw SQL client
//!
//! The executor only needs "run this one statement, give me rows". The
//! PostgreSQL implementation decodes each column by its reported type into a
//! JSON scalar; types it does not know how to render fail the whole query.

use crate::error::{IntelError, Result};
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Decimal;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tracing::debug;

#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Run a single parameterless statement and return its result set as a
    /// JSON array of row objects.
    async fn query_raw(&self, sql: &str) -> Result<Value>;
}

/// `SqlClient` backed by a PostgreSQL pool.
///
/// Statements go through the extended query protocol, which refuses more
/// than one command per statement on the server side as well.
pub struct PgSqlClient {
    pool: PgPool,
}

impl PgSqlClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlClient for PgSqlClient {
    async fn query_raw(&self, sql: &str) -> Result<Value> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), "Statement returned");

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            result.push(Value::Object(row_to_json(row)?));
        }
        Ok(Value::Array(result))
    }
}

fn row_to_json(row: &PgRow) -> Result<Map<String, Value>> {
    let mut row_obj = Map::new();
    for (i, col) in row.columns().iter().enumerate() {
        let value = cell_to_json(row, i, col.type_info().name()).map_err(|e| {
            IntelError::Database(format!("Failed to decode column '{}': {}", col.name(), e))
        })?;
        row_obj.insert(col.name().to_string(), value);
    }
    Ok(row_obj)
}

fn cell_to_json(row: &PgRow, i: usize, col_type: &str) -> Result<Value> {
    let value = match col_type {
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(i)?.map(Value::String)
        }
        "INT2" => row.try_get::<Option<i16>, _>(i)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(i)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(i)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)?
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(i)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(i)?.map(decimal_to_json),
        "BOOL" => row.try_get::<Option<bool>, _>(i)?.map(Value::Bool),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(i)?
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(i)?,
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(i)?
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(i)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)?
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)?
            .map(|v| Value::String(v.to_rfc3339())),
        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Option<Vec<String>>, _>(i)?
            .map(|v| Value::Array(v.into_iter().map(Value::String).collect())),
        "INT4[]" => row
            .try_get::<Option<Vec<i32>>, _>(i)?
            .map(|v| Value::Array(v.into_iter().map(Value::from).collect())),
        "INT8[]" => row
            .try_get::<Option<Vec<i64>>, _>(i)?
            .map(|v| Value::Array(v.into_iter().map(Value::from).collect())),
        "VOID" => None,
        other => {
            return Err(IntelError::Database(format!(
                "unsupported column type {}",
                other
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Whole numerics stay integers (so wide values get string coercion later).
/// Fractional ones become doubles only when the double prints back to the
/// same digits; anything else stays text.
fn decimal_to_json(value: Decimal) -> Value {
    let text = value.normalize().to_string();
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if !text.contains('.') {
        if let Ok(u) = text.parse::<u64>() {
            return Value::from(u);
        }
        return Value::String(text);
    }
    match text.parse::<f64>() {
        Ok(f) if f.to_string() == text => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}
