//! Query Executor
//!
//! Validate → sanitize → run one statement → check the result is tabular.
//! Every failure is folded into an [`ExecutionResult`]; callers never need to
//! handle an `Err` from here.

use crate::db::SqlClient;
use crate::execution::result::{ExecutionResult, Row};
use crate::security::{is_query_safe, sanitize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct QueryExecutor {
    client: Arc<dyn SqlClient>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn SqlClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Execute a model-generated statement against the analytics database.
    ///
    /// Unsafe SQL is rejected before the client is touched.
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        let validation = is_query_safe(sql);
        if !validation.safe {
            let reason = validation
                .reason
                .unwrap_or_else(|| "Query rejected by safety policy".to_string());
            warn!(%reason, sql, "Rejected unsafe SQL");
            return ExecutionResult::error(reason);
        }

        let statement = sanitize(sql);
        let start_time = Instant::now();

        let raw = match tokio::time::timeout(self.timeout, self.client.query_raw(&statement)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, sql = %statement, "Query execution failed");
                return ExecutionResult::error(e.to_string());
            }
            Err(_) => {
                warn!(sql = %statement, timeout_secs = self.timeout.as_secs_f64(), "Query timed out");
                return ExecutionResult::error(format!(
                    "Query timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                ));
            }
        };

        match into_rows(raw) {
            Ok(rows) => {
                info!(
                    rows = rows.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Query executed"
                );
                ExecutionResult::success(rows)
            }
            Err(reason) => {
                warn!(%reason, sql = %statement, "Query returned a non-tabular result");
                ExecutionResult::error(reason)
            }
        }
    }
}

/// Fail closed unless the result is an array of plain objects.
fn into_rows(raw: Value) -> std::result::Result<Vec<Row>, String> {
    let items = match raw {
        Value::Array(items) => items,
        other => {
            return Err(format!(
                "Expected query result to be a list of rows, got {}",
                kind_of(&other)
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(format!(
                "Expected row {} to be an object, got {}",
                idx,
                kind_of(&other)
            )),
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
