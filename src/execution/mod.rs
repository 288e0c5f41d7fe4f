//! Execution Module
//!
//! Runs validated analytics SQL and normalizes its outcome.

pub mod executor;
pub mod result;

pub use executor::QueryExecutor;
pub use result::{serialize_rows, ExecutionResult, Row, MAX_SAFE_INTEGER};
