//! `POST /api/intelligence/query`

use crate::pipeline::{QueryFailure, QueryPipeline};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const MISSING_QUESTION: &str = "Question is required and must be a string";

pub async fn query(
    State(pipeline): State<Arc<QueryPipeline>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let question = match body {
        Ok(Json(body)) => match body.get("question") {
            Some(Value::String(question)) => question.clone(),
            _ => return QueryFailure::InvalidInput(MISSING_QUESTION.to_string()).into_response(),
        },
        Err(rejection) => {
            debug!(error = %rejection, "Rejected request body");
            return QueryFailure::InvalidInput(MISSING_QUESTION.to_string()).into_response();
        }
    };

    match pipeline.answer(&question).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

impl IntoResponse for QueryFailure {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}
