//! Security layer
//!
//! Keyword-based SQL guard and sanitizer applied before any generated SQL
//! reaches the database.

pub mod query_guards;
pub mod sanitizer;

pub use query_guards::{is_query_safe, ValidationResult};
pub use sanitizer::sanitize;
