//! Result Summarizer
//!
//! Natural-language summaries of query results. Summaries never fail: a
//! completion-service error degrades to a templated sentence, and ranked
//! leaderboard results are described locally without a model call.

use crate::execution::Row;
use crate::llm::{CompletionRequest, CompletionService};
use crate::sql_generation::VisualizationKind;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rows shown to the model; the rest are only counted
pub const PREVIEW_ROWS: usize = 10;
const LEADERBOARD_ENTRIES: usize = 3;
const POST_WORD_LIMIT: u32 = 60;
const SUMMARY_TEMPERATURE: f32 = 0.5;

const NAME_HINTS: [&str; 1] = ["name"];
const SCORE_HINTS: [&str; 3] = ["score", "points", "votes"];

pub struct ResultSummarizer {
    llm: Arc<dyn CompletionService>,
    language: String,
    word_limit: u32,
}

impl ResultSummarizer {
    pub fn new(llm: Arc<dyn CompletionService>, language: impl Into<String>, word_limit: u32) -> Self {
        Self {
            llm,
            language: language.into(),
            word_limit,
        }
    }

    /// Summarize rows for the question. Leaderboard results with at least one
    /// row take the local templated path.
    pub async fn summarize(
        &self,
        question: &str,
        rows: &[Row],
        explanation: &str,
        visualization: Option<VisualizationKind>,
    ) -> String {
        if visualization == Some(VisualizationKind::Leaderboard) && !rows.is_empty() {
            debug!("Using templated leaderboard summary");
            return leaderboard_summary(rows);
        }

        let request = CompletionRequest {
            system: format!(
                "You are a data analyst for a brand-voting platform. Summarize query results \
                 for a business user in {} using at most {} words. Mention the most important \
                 numbers and names. Do not mention SQL.",
                self.language, self.word_limit
            ),
            user: format!(
                "Question: {}\nWhat the query returns: {}\nTotal rows: {}\nResults:\n{}",
                question,
                explanation,
                rows.len(),
                rows_preview(rows)
            ),
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: self.word_limit.saturating_mul(3).max(200),
            json_mode: false,
        };

        match self.llm.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Completion service returned an empty summary, using fallback");
                fallback_summary(rows.len(), explanation)
            }
            Err(e) => {
                warn!(error = %e, "Summarization failed, using fallback");
                fallback_summary(rows.len(), explanation)
            }
        }
    }

    /// Write the result as a short shareable social post.
    pub async fn summarize_as_post(&self, rows: &[Row], question: &str) -> String {
        let word_limit = self.word_limit.min(POST_WORD_LIMIT);
        let request = CompletionRequest {
            system: format!(
                "You write short, upbeat social media posts for a brand-voting community. \
                 Write in {} using at most {} words. Highlight the leading brands and their \
                 numbers. At most two hashtags, no links.",
                self.language, word_limit
            ),
            user: format!(
                "Topic: {}\nTotal rows: {}\nData:\n{}",
                question,
                rows.len(),
                rows_preview(rows)
            ),
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: word_limit.saturating_mul(3).max(200),
            json_mode: false,
        };

        match self.llm.complete(&request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_post(rows, question),
            Err(e) => {
                warn!(error = %e, "Post generation failed, using fallback");
                fallback_post(rows, question)
            }
        }
    }
}

/// Templated description of the top three ranked rows.
pub fn leaderboard_summary(rows: &[Row]) -> String {
    let entries = ranked_entries(rows, LEADERBOARD_ENTRIES);
    format!("Top {} results:\n{}", entries.len(), entries.join("\n"))
}

pub fn fallback_summary(row_count: usize, explanation: &str) -> String {
    let noun = if row_count == 1 { "result" } else { "results" };
    format!("Found {} {}. {}", row_count, noun, explanation)
        .trim_end()
        .to_string()
}

fn fallback_post(rows: &[Row], question: &str) -> String {
    if rows.is_empty() {
        return format!("{}\nNo data yet. Cast your votes!", question);
    }
    let entries = ranked_entries(rows, LEADERBOARD_ENTRIES);
    format!(
        "{}\n{}\nBased on {} results.",
        question,
        entries.join("\n"),
        rows.len()
    )
}

fn ranked_entries(rows: &[Row], limit: usize) -> Vec<String> {
    rows.iter()
        .take(limit)
        .enumerate()
        .map(|(idx, row)| {
            let name = name_of(row).unwrap_or_else(|| format!("Entry {}", idx + 1));
            match score_of(row) {
                Some((column, score)) => format!("{}. {} ({}: {})", idx + 1, name, column, score),
                None => format!("{}. {}", idx + 1, name),
            }
        })
        .collect()
}

fn name_of(row: &Row) -> Option<String> {
    row.iter()
        .find(|(key, value)| has_hint(key, &NAME_HINTS) && !value.is_null())
        .or_else(|| row.iter().find(|(_, value)| value.is_string()))
        .map(|(_, value)| display(value))
}

fn score_of(row: &Row) -> Option<(String, String)> {
    row.iter()
        .find(|(key, value)| has_hint(key, &SCORE_HINTS) && !value.is_null())
        .or_else(|| {
            row.iter()
                .find(|(key, value)| value.is_number() && !has_hint(key, &NAME_HINTS))
        })
        .map(|(key, value)| (key.clone(), display(value)))
}

fn has_hint(key: &str, hints: &[&str]) -> bool {
    let key = key.to_lowercase();
    hints.iter().any(|hint| key.contains(hint))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON of the first [`PREVIEW_ROWS`] rows plus a count of the rest.
pub fn rows_preview(rows: &[Row]) -> String {
    let shown = &rows[..rows.len().min(PREVIEW_ROWS)];
    let mut preview = serde_json::to_string(shown).unwrap_or_else(|_| "[]".to_string());
    if rows.len() > PREVIEW_ROWS {
        preview.push_str(&format!("\n... and {} more rows", rows.len() - PREVIEW_ROWS));
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IntelError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingLlm {
        reply: Option<&'static str>,
        calls: AtomicUsize,
        last_user: Mutex<String>,
    }

    impl CountingLlm {
        fn new(reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last_user: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for CountingLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_user.lock().unwrap() = request.user.clone();
            self.reply
                .map(str::to_string)
                .ok_or_else(|| IntelError::Llm("model overloaded".to_string()))
        }
    }

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn brands() -> Vec<Row> {
        rows(vec![
            json!({"brand_name": "Nike", "weekly_score": 1500}),
            json!({"brand_name": "Adidas", "weekly_score": 1200}),
            json!({"brand_name": "Puma", "weekly_score": 900}),
            json!({"brand_name": "Reebok", "weekly_score": 300}),
        ])
    }

    #[tokio::test]
    async fn test_leaderboard_fast_path_skips_model() {
        let llm = CountingLlm::new(Some("unused"));
        let summarizer = ResultSummarizer::new(llm.clone(), "English", 150);

        let summary = summarizer
            .summarize("top brands", &brands(), "ranked", Some(VisualizationKind::Leaderboard))
            .await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            summary,
            "Top 3 results:\n1. Nike (weekly_score: 1500)\n2. Adidas (weekly_score: 1200)\n3. Puma (weekly_score: 900)"
        );
    }

    #[tokio::test]
    async fn test_empty_leaderboard_uses_model() {
        let llm = CountingLlm::new(Some("Nothing yet."));
        let summarizer = ResultSummarizer::new(llm.clone(), "English", 150);

        let summary = summarizer
            .summarize("top brands", &[], "ranked", Some(VisualizationKind::Leaderboard))
            .await;

        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary, "Nothing yet.");
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let llm = CountingLlm::new(None);
        let summarizer = ResultSummarizer::new(llm, "English", 150);

        let summary = summarizer
            .summarize("votes per day", &brands(), "Daily vote counts.", None)
            .await;

        assert_eq!(summary, "Found 4 results. Daily vote counts.");
    }

    #[tokio::test]
    async fn test_post_failure_falls_back() {
        let llm = CountingLlm::new(None);
        let summarizer = ResultSummarizer::new(llm, "English", 150);

        let post = summarizer.summarize_as_post(&brands(), "Brands of the week").await;

        assert!(post.starts_with("Brands of the week\n1. Nike"));
        assert!(post.ends_with("Based on 4 results."));
    }

    #[tokio::test]
    async fn test_preview_is_capped() {
        let llm = CountingLlm::new(Some("ok"));
        let summarizer = ResultSummarizer::new(llm.clone(), "English", 150);
        let many: Vec<Row> = (0..25)
            .map(|i| json!({"day": i, "votes": i * 2}).as_object().cloned().unwrap())
            .collect();

        summarizer.summarize("votes", &many, "per day", Some(VisualizationKind::Line)).await;

        let user = llm.last_user.lock().unwrap().clone();
        assert!(user.contains("Total rows: 25"));
        assert!(user.contains("... and 15 more rows"));
        assert!(!user.contains(r#""day":10"#));
    }

    #[test]
    fn test_name_and_score_heuristics() {
        let row = &rows(vec![json!({"id": 7, "username": "alice", "points": 60})])[0];
        assert_eq!(name_of(row), Some("alice".to_string()));
        assert_eq!(score_of(row), Some(("points".to_string(), "60".to_string())));

        let row = &rows(vec![json!({"label": "Nike", "total": "123456789012345678"})])[0];
        assert_eq!(name_of(row), Some("Nike".to_string()));
        assert_eq!(score_of(row), None);
    }

    #[test]
    fn test_fallback_summary_grammar() {
        assert_eq!(fallback_summary(1, ""), "Found 1 result.");
        assert_eq!(fallback_summary(0, "No votes."), "Found 0 results. No votes.");
    }
}
