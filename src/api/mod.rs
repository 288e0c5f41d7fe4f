//! HTTP API
//!
//! Routes for the analytics dashboard. Authentication is handled by the
//! platform in front of this service.

pub mod intelligence;

use crate::pipeline::QueryPipeline;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Build the application router around a shared pipeline.
pub fn router(pipeline: Arc<QueryPipeline>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/intelligence/query", post(intelligence::query))
        .with_state(pipeline)
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok", "service": "brand-intel"}))
}
