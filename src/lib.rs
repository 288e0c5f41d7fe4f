//! Natural-language analytics for the brand-voting platform.
//!
//! A question is translated to SQL by a language model, checked by the query
//! guards, executed against the analytics database and summarized.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod security;
pub mod sql_generation;
pub mod summary;

pub use error::{IntelError, Result};
pub use pipeline::{PipelineSettings, QueryFailure, QueryPipeline, QueryResponse};
