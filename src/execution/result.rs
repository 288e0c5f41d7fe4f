//! Query Result - uniform outcome of running one analytics statement

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name to scalar value, in column order.
pub type Row = Map<String, Value>;

/// Largest integer a JavaScript client can represent exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Outcome of the query executor. Never carries both `data` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Success status
    pub success: bool,

    /// Rows returned by the statement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,

    /// Failure reason (validation or execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Create a successful result
    pub fn success(rows: Vec<Row>) -> Self {
        Self {
            success: true,
            data: Some(rows),
            error: None,
        }
    }

    /// Create an error result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.data.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Make rows safe for JSON consumers that store numbers as doubles.
///
/// Integers outside ±[`MAX_SAFE_INTEGER`] become decimal strings; everything
/// else is passed through. Nested arrays/objects (json columns) are walked.
pub fn serialize_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(column, value)| (column, widen_integers(value)))
                .collect()
        })
        .collect()
}

fn widen_integers(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            let exceeds = if let Some(i) = n.as_i64() {
                !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i)
            } else if let Some(u) = n.as_u64() {
                u > MAX_SAFE_INTEGER as u64
            } else {
                false
            };
            if exceeds {
                Value::String(n.to_string())
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(widen_integers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, widen_integers(v)))
                .collect(),
        ),
        other => other,
    }
}
