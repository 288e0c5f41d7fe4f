//! In-memory stand-ins for the completion service and the database.

#![allow(dead_code)]

use async_trait::async_trait;
use brand_intel::db::SqlClient;
use brand_intel::llm::{CompletionRequest, CompletionService};
use brand_intel::schema::SchemaDescription;
use brand_intel::{IntelError, PipelineSettings, QueryPipeline, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers SQL-generation requests (JSON mode) and summary requests
/// (plain text) from separate scripts.
pub struct FakeLlm {
    generation: std::result::Result<String, String>,
    summary: std::result::Result<String, String>,
    generation_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl FakeLlm {
    pub fn new(generation: Value, summary: &str) -> Arc<Self> {
        Arc::new(Self {
            generation: Ok(generation.to_string()),
            summary: Ok(summary.to_string()),
            generation_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            generation: Err(message.to_string()),
            summary: Err(message.to_string()),
            generation_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        })
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for FakeLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let (reply, calls) = if request.json_mode {
            (&self.generation, &self.generation_calls)
        } else {
            (&self.summary, &self.summary_calls)
        };
        calls.fetch_add(1, Ordering::SeqCst);
        reply.clone().map_err(IntelError::Llm)
    }
}

pub struct FakeSql {
    reply: std::result::Result<Value, String>,
    calls: AtomicUsize,
}

impl FakeSql {
    pub fn returning(rows: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(rows),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlClient for FakeSql {
    async fn query_raw(&self, _sql: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(IntelError::Database)
    }
}

pub fn pipeline(llm: Arc<FakeLlm>, sql: Arc<FakeSql>) -> Arc<QueryPipeline> {
    Arc::new(QueryPipeline::new(
        llm,
        sql,
        SchemaDescription::builtin(),
        PipelineSettings::default(),
    ))
}

pub fn generation(sql: &str, explanation: &str, visualization: &str) -> Value {
    json!({
        "sql": sql,
        "explanation": explanation,
        "visualization": { "type": visualization }
    })
}
