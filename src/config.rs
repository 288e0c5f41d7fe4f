//! Service configuration read from the environment (and `.env`).

use crate::error::{IntelError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Connection string for the analytics database (read + temp-table role)
    pub database_url: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub bind_addr: String,
    pub llm_timeout: Duration,
    pub query_timeout: Duration,
    pub db_max_connections: u32,
    /// SQL dialect named in the generation prompt
    pub sql_dialect: String,
    pub summary_language: String,
    pub summary_word_limit: u32,
    /// Optional override for the built-in schema description
    pub schema_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            openai_api_key: String::new(),
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            llm_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            db_max_connections: 10,
            sql_dialect: "PostgreSQL".to_string(),
            summary_language: "English".to_string(),
            summary_word_limit: 150,
            schema_path: None,
        }
    }
}

impl AppConfig {
    /// Build from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            database_url: get("DATABASE_URL"),
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            llm_timeout: parse_or(get("LLM_TIMEOUT_SECS"), "LLM_TIMEOUT_SECS", 30)
                .map(Duration::from_secs)?,
            query_timeout: parse_or(get("QUERY_TIMEOUT_SECS"), "QUERY_TIMEOUT_SECS", 30)
                .map(Duration::from_secs)?,
            db_max_connections: parse_or(
                get("DB_MAX_CONNECTIONS"),
                "DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            sql_dialect: get("SQL_DIALECT").unwrap_or(defaults.sql_dialect),
            summary_language: get("SUMMARY_LANGUAGE").unwrap_or(defaults.summary_language),
            summary_word_limit: parse_or(
                get("SUMMARY_WORD_LIMIT"),
                "SUMMARY_WORD_LIMIT",
                defaults.summary_word_limit,
            )?,
            schema_path: get("SCHEMA_PATH").map(PathBuf::from),
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| IntelError::Config("DATABASE_URL is not set".to_string()))
    }
}

/// Parse a strictly positive number; zero would disable a timeout or the pool.
fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(IntelError::Config(format!(
            "{} must be a positive number, got '{}'",
            key, value
        ))),
    }
}
