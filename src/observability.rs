//! Query audit log
//!
//! One structured record per analytics request, emitted through `tracing`
//! so failures can be reproduced from the question, the generated SQL and
//! the underlying message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Terminal state of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Answered,
    InvalidInput,
    ServiceUnavailable,
    GenerationFailed,
    Rejected,
}

/// Query execution log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub query_id: Uuid,
    pub question: String,
    pub sql_generated: Option<String>,
    pub status: QueryStatus,
    pub error_message: Option<String>,
    pub rows_returned: Option<usize>,
    pub execution_time_ms: u64,
}

impl QueryLogEntry {
    pub fn new(query_id: Uuid, question: &str, status: QueryStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            query_id,
            question: question.to_string(),
            sql_generated: None,
            status,
            error_message: None,
            rows_returned: None,
            execution_time_ms: 0,
        }
    }

    pub fn emit(&self) {
        let sql = self.sql_generated.as_deref().unwrap_or("");
        match self.status {
            QueryStatus::Answered => info!(
                query_id = %self.query_id,
                question = %self.question,
                sql,
                rows = self.rows_returned.unwrap_or(0),
                elapsed_ms = self.execution_time_ms,
                "Intelligence query answered"
            ),
            status => warn!(
                query_id = %self.query_id,
                question = %self.question,
                sql,
                ?status,
                error = self.error_message.as_deref().unwrap_or(""),
                elapsed_ms = self.execution_time_ms,
                "Intelligence query failed"
            ),
        }
    }
}
