use thiserror::Error;

/// Markers in an upstream error message that identify a completion-service
/// outage rather than a bad question.
const SERVICE_MARKERS: [&str; 3] = ["api key", "quota", "model"];

#[derive(Error, Debug)]
pub enum IntelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Llm(String),

    #[error("{0}")]
    LlmParse(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntelError {
    /// True when the failure means "the AI service is unavailable, try again
    /// later" as opposed to "your question or query is wrong".
    ///
    /// Every `Llm` error qualifies. Other variants qualify only when their
    /// message names an API key, quota or model problem; `LlmParse` never does
    /// because "no response from model" is a bad completion, not an outage.
    pub fn is_service_unavailable(&self) -> bool {
        match self {
            IntelError::Llm(_) => true,
            IntelError::LlmParse(_) => false,
            other => {
                let message = other.to_string().to_lowercase();
                SERVICE_MARKERS.iter().any(|marker| message.contains(marker))
            }
        }
    }
}

impl From<sqlx::Error> for IntelError {
    fn from(err: sqlx::Error) -> Self {
        IntelError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IntelError>;
