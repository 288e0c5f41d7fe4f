//! Intelligence pipeline
//!
//! Question → SQL generation → guarded execution → summary. Owns the
//! injected clients; nothing here is process-global.

use crate::config::AppConfig;
use crate::db::{init_pool, PgSqlClient, SqlClient};
use crate::error::{IntelError, Result};
use crate::execution::{serialize_rows, QueryExecutor, Row};
use crate::llm::{CompletionService, LlmClient};
use crate::observability::{QueryLogEntry, QueryStatus};
use crate::schema::SchemaDescription;
use crate::sql_generation::{SqlGenerator, Visualization, VisualizationKind};
use crate::summary::ResultSummarizer;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

pub const SERVICE_ERROR_PREFIX: &str = "AI Service Error:";

/// Knobs for the pipeline stages
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub sql_dialect: String,
    pub summary_language: String,
    pub summary_word_limit: u32,
    pub query_timeout: Duration,
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            sql_dialect: config.sql_dialect.clone(),
            summary_language: config.summary_language.clone(),
            summary_word_limit: config.summary_word_limit,
            query_timeout: config.query_timeout,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Successful answer envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub sql: String,
    pub explanation: String,
    pub visualization: Option<Visualization>,
    pub data: Vec<Row>,
    pub summary: String,
    pub row_count: usize,
}

/// Classified failure, one per response status
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFailure {
    /// Missing or blank question (400)
    InvalidInput(String),
    /// Completion service outage, quota or key problem (503)
    ServiceUnavailable(String),
    /// Generated SQL was rejected or failed to execute (400)
    Rejected {
        error: String,
        sql: String,
        explanation: String,
    },
    /// Anything else (500)
    Internal(String),
}

impl QueryFailure {
    pub fn status_code(&self) -> u16 {
        match self {
            QueryFailure::InvalidInput(_) | QueryFailure::Rejected { .. } => 400,
            QueryFailure::ServiceUnavailable(_) => 503,
            QueryFailure::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            QueryFailure::InvalidInput(error)
            | QueryFailure::ServiceUnavailable(error)
            | QueryFailure::Internal(error) => json!({ "error": error }),
            QueryFailure::Rejected {
                error,
                sql,
                explanation,
            } => json!({ "error": error, "sql": sql, "explanation": explanation }),
        }
    }

    fn status(&self) -> QueryStatus {
        match self {
            QueryFailure::InvalidInput(_) => QueryStatus::InvalidInput,
            QueryFailure::ServiceUnavailable(_) => QueryStatus::ServiceUnavailable,
            QueryFailure::Rejected { .. } => QueryStatus::Rejected,
            QueryFailure::Internal(_) => QueryStatus::GenerationFailed,
        }
    }

    fn message(&self) -> &str {
        match self {
            QueryFailure::InvalidInput(error)
            | QueryFailure::ServiceUnavailable(error)
            | QueryFailure::Internal(error)
            | QueryFailure::Rejected { error, .. } => error,
        }
    }
}

impl From<IntelError> for QueryFailure {
    fn from(err: IntelError) -> Self {
        match err {
            IntelError::InvalidInput(message) => QueryFailure::InvalidInput(message),
            err if err.is_service_unavailable() => {
                QueryFailure::ServiceUnavailable(format!("{} {}", SERVICE_ERROR_PREFIX, err))
            }
            err => QueryFailure::Internal(err.to_string()),
        }
    }
}

pub struct QueryPipeline {
    generator: SqlGenerator,
    executor: QueryExecutor,
    summarizer: ResultSummarizer,
    schema: Arc<SchemaDescription>,
}

impl QueryPipeline {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        sql: Arc<dyn SqlClient>,
        schema: SchemaDescription,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator: SqlGenerator::new(llm.clone(), settings.sql_dialect),
            executor: QueryExecutor::new(sql, settings.query_timeout),
            summarizer: ResultSummarizer::new(
                llm,
                settings.summary_language,
                settings.summary_word_limit,
            ),
            schema: Arc::new(schema),
        }
    }

    /// Wire the production clients: PostgreSQL pool, OpenAI client and the
    /// configured schema description.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let schema = match &config.schema_path {
            Some(path) => SchemaDescription::from_file(path)?,
            None => SchemaDescription::builtin(),
        };

        if config.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; questions will fail with a service error");
        }
        let llm = LlmClient::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.llm_timeout,
        )?;

        let pool = init_pool(
            config.require_database_url()?,
            config.db_max_connections,
            Duration::from_secs(30),
        )
        .await?;

        info!(
            model = llm.model(),
            schema_version = schema.version(),
            dialect = %config.sql_dialect,
            "Intelligence pipeline ready"
        );
        Ok(Self::new(
            Arc::new(llm),
            Arc::new(PgSqlClient::new(pool)),
            schema,
            PipelineSettings::from(config),
        ))
    }

    /// Answer one question end to end, logging a single audit record.
    pub async fn answer(&self, question: &str) -> std::result::Result<QueryResponse, QueryFailure> {
        let start_time = Instant::now();
        let mut sql_generated = None;

        let outcome = self.run(question, &mut sql_generated).await;

        let mut log = match &outcome {
            Ok(response) => {
                let mut log = QueryLogEntry::new(Uuid::new_v4(), question, QueryStatus::Answered);
                log.rows_returned = Some(response.row_count);
                log
            }
            Err(failure) => {
                let mut log = QueryLogEntry::new(Uuid::new_v4(), question, failure.status());
                log.error_message = Some(failure.message().to_string());
                log
            }
        };
        log.sql_generated = sql_generated;
        log.execution_time_ms = start_time.elapsed().as_millis() as u64;
        log.emit();
        outcome
    }

    async fn run(
        &self,
        question: &str,
        sql_generated: &mut Option<String>,
    ) -> std::result::Result<QueryResponse, QueryFailure> {
        let question = validate_question(question)?;

        let generated = self.generator.generate(question, &self.schema).await?;
        *sql_generated = Some(generated.sql.clone());

        let execution = self.executor.execute(&generated.sql).await;
        let rows = match (execution.success, execution.data) {
            (true, Some(rows)) => serialize_rows(rows),
            _ => {
                return Err(QueryFailure::Rejected {
                    error: execution
                        .error
                        .unwrap_or_else(|| "Query execution failed".to_string()),
                    sql: generated.sql,
                    explanation: generated.explanation,
                })
            }
        };

        let kind = generated.visualization.as_ref().map(|v| v.kind);
        let summary = match kind {
            Some(VisualizationKind::AnalysisPost) => {
                self.summarizer.summarize_as_post(&rows, question).await
            }
            _ => {
                self.summarizer
                    .summarize(question, &rows, &generated.explanation, kind)
                    .await
            }
        };

        Ok(QueryResponse {
            success: true,
            row_count: rows.len(),
            sql: generated.sql,
            explanation: generated.explanation,
            visualization: generated.visualization,
            data: rows,
            summary,
        })
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(IntelError::InvalidInput(
            "Question is required and must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed)
}
