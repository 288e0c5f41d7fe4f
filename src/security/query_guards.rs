//! Query Guards
//!
//! Keyword allow-list-by-exclusion check for model-generated SQL.
//!
//! The guard does not parse SQL. A blocked word inside a string literal or an
//! identifier is rejected (false positive), and vendor-specific mutating
//! statements that are not on the list pass (false negative). It is a first
//! filter only; the analytics database role must itself be limited to reads
//! and temporary tables.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Statements that mutate data, change privileges or run procedures.
pub const BLOCKED_KEYWORDS: [&str; 13] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE", "EXEC",
    "EXECUTE", "CALL", "DECLARE", "SET",
];

pub const PERMANENT_TABLE_REASON: &str =
    "Only CREATE TEMPORARY TABLE is allowed, not permanent tables.";
pub const MULTIPLE_STATEMENTS_REASON: &str = "Multiple statements not allowed.";

lazy_static! {
    static ref CREATE_RE: Regex = Regex::new(r"(?i)\bCREATE\b").unwrap();
    static ref CREATE_TEMPORARY_RE: Regex =
        Regex::new(r"(?i)\bCREATE\s+TEMPORARY\s+TABLE\b").unwrap();
    static ref BLOCKED_RES: Vec<(&'static str, Regex)> = BLOCKED_KEYWORDS
        .iter()
        .map(|kw| (*kw, Regex::new(&format!(r"(?i)\b{}\b", kw)).unwrap()))
        .collect();
}

/// Outcome of [`is_query_safe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub safe: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn safe() -> Self {
        Self { safe: true, reason: None }
    }

    pub fn unsafe_because(reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: Some(reason.into()),
        }
    }
}

/// Classify a candidate statement. Rules apply in order, first match wins:
/// permanent `CREATE`, blocked keyword, more than one statement.
pub fn is_query_safe(sql: &str) -> ValidationResult {
    if CREATE_RE.is_match(sql) && !CREATE_TEMPORARY_RE.is_match(sql) {
        return ValidationResult::unsafe_because(PERMANENT_TABLE_REASON);
    }

    if let Some((keyword, _)) = BLOCKED_RES.iter().find(|(_, re)| re.is_match(sql)) {
        return ValidationResult::unsafe_because(format!(
            "Query contains forbidden keyword: {}",
            keyword.to_uppercase()
        ));
    }

    let statements = sql
        .split(';')
        .filter(|fragment| !fragment.trim().is_empty())
        .count();
    if statements > 1 {
        return ValidationResult::unsafe_because(MULTIPLE_STATEMENTS_REASON);
    }

    ValidationResult::safe()
}
