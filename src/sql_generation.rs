//! SQL Generation
//!
//! Turns a business question into a single read-only statement plus an
//! explanation and a visualization hint, using the completion service.
//!
//! Model output is untrusted: it is parsed as JSON and shape-checked here,
//! and the SQL still has to pass the query guards before it is executed.

use crate::error::{IntelError, Result};
use crate::llm::{CompletionRequest, CompletionService};
use crate::schema::SchemaDescription;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_RESPONSE: &str = "No response from model";

const GENERATION_TEMPERATURE: f32 = 0.1;
const GENERATION_MAX_TOKENS: u32 = 1000;

/// How the client should present the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationKind {
    Leaderboard,
    AnalysisPost,
    Table,
    Chart,
    Number,
    Bar,
    Line,
    Pie,
    Area,
}

/// Visualization hint: a kind plus whatever axis/title fields the model added
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visualization {
    #[serde(rename = "type")]
    pub kind: VisualizationKind,

    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Visualization {
    pub fn of(kind: VisualizationKind) -> Self {
        Self {
            kind,
            options: Map::new(),
        }
    }
}

/// A question translated into SQL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedQuery {
    pub sql: String,
    pub explanation: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
}

#[derive(Debug, Deserialize)]
struct RawGeneratedQuery {
    sql: Option<Value>,
    explanation: Option<Value>,
    visualization: Option<Value>,
    #[serde(rename = "suggestedVisualization")]
    suggested_visualization: Option<Value>,
}

pub struct SqlGenerator {
    llm: Arc<dyn CompletionService>,
    dialect: String,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn CompletionService>, dialect: impl Into<String>) -> Self {
        Self {
            llm,
            dialect: dialect.into(),
        }
    }

    pub async fn generate(
        &self,
        question: &str,
        schema: &SchemaDescription,
    ) -> Result<GeneratedQuery> {
        let request = CompletionRequest {
            system: self.system_prompt(schema),
            user: format!("Question: {}", question),
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
            json_mode: true,
        };

        debug!(schema_version = schema.version(), "Requesting SQL generation");
        let response = self.llm.complete(&request).await?;
        let generated = parse_generated_query(&response)?;

        info!(
            sql = %generated.sql,
            visualization = ?generated.visualization.as_ref().map(|v| v.kind),
            "Generated SQL"
        );
        Ok(generated)
    }

    fn system_prompt(&self, schema: &SchemaDescription) -> String {
        format!(
            r#"You are a SQL expert for a brand-voting platform analytics dashboard.
Translate the user's question into ONE {dialect} query over this schema:

{schema}

Rules:
- Only SELECT statements (a single CREATE TEMPORARY TABLE is allowed when truly needed). Never modify data.
- Exactly one statement, no trailing commentary.
- Give every computed column a descriptive alias (brand_name, total_votes, weekly_score).
- Return at most 1000 rows; add LIMIT when the result could be larger.
- Use JOINs to show names instead of raw ids.
- Format dates in a human-readable way.
- Use {dialect} syntax and functions only.

Visualization types: leaderboard (ranked names with scores), analysis_post (a shareable social post), table, chart, number (single value), bar, line, pie, area.

Return JSON only:
{{"sql": "SELECT ...", "explanation": "what the query returns, in one or two sentences", "visualization": {{"type": "leaderboard", "title": "optional title"}}}}"#,
            dialect = self.dialect,
            schema = schema.text(),
        )
    }
}

/// Parse and shape-check a generation completion.
pub fn parse_generated_query(response: &str) -> Result<GeneratedQuery> {
    // Clean response - remove markdown code blocks if present
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if cleaned.is_empty() {
        warn!("Completion service returned an empty SQL generation response");
        return Err(IntelError::LlmParse(NO_RESPONSE.to_string()));
    }

    let raw: RawGeneratedQuery = serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, response = %cleaned, "SQL generation response is not valid JSON");
        IntelError::LlmParse(format!("{}: invalid JSON ({})", NO_RESPONSE, e))
    })?;

    let sql = match raw.sql {
        Some(Value::String(sql)) if !sql.trim().is_empty() => sql.trim().to_string(),
        _ => {
            warn!(response = %cleaned, "SQL generation response has no usable sql field");
            return Err(IntelError::LlmParse(
                "Model response did not contain a SQL query".to_string(),
            ));
        }
    };

    let explanation = match raw.explanation {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };

    Ok(GeneratedQuery {
        sql,
        explanation,
        visualization: raw
            .visualization
            .filter(|v| !v.is_null())
            .or(raw.suggested_visualization)
            .and_then(parse_visualization),
    })
}

fn parse_visualization(value: Value) -> Option<Visualization> {
    let (type_name, options) = match value {
        Value::String(type_name) => (type_name, Map::new()),
        Value::Object(mut map) => match map.remove("type") {
            Some(Value::String(type_name)) => (type_name, map),
            _ => return None,
        },
        _ => return None,
    };

    let kind = serde_json::from_value::<VisualizationKind>(Value::String(type_name.clone()))
        .unwrap_or_else(|_| {
            warn!(%type_name, "Unknown visualization type, falling back to table");
            VisualizationKind::Table
        });
    Some(Visualization { kind, options })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedLlm {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionService for ScriptedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(IntelError::Llm(message.clone())),
            }
        }
    }

    fn generator(
        reply: std::result::Result<String, String>,
    ) -> (SqlGenerator, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (SqlGenerator::new(llm.clone(), "PostgreSQL"), llm)
    }

    #[tokio::test]
    async fn test_generate_parses_structured_reply() {
        let reply = json!({
            "sql": "SELECT name, score FROM brands ORDER BY score DESC LIMIT 3",
            "explanation": "Top three brands by score",
            "visualization": {"type": "leaderboard", "title": "Top brands"}
        })
        .to_string();
        let (generator, llm) = generator(Ok(reply));

        let generated = generator
            .generate("top 3 brands", &SchemaDescription::builtin())
            .await
            .unwrap();

        assert_eq!(generated.sql, "SELECT name, score FROM brands ORDER BY score DESC LIMIT 3");
        let viz = generated.visualization.unwrap();
        assert_eq!(viz.kind, VisualizationKind::Leaderboard);
        assert_eq!(viz.options["title"], json!("Top brands"));

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].json_mode);
        assert!(seen[0].temperature <= 0.2);
        assert!(seen[0].system.contains("TABLE user_brand_votes"));
        assert!(seen[0].system.contains("PostgreSQL"));
        assert!(seen[0].system.contains("Only SELECT statements"));
        assert!(seen[0].system.contains("at most 1000 rows"));
        assert!(seen[0].system.contains("Use JOINs"));
        assert!(seen[0].system.contains("descriptive alias"));
        assert!(seen[0].user.contains("top 3 brands"));
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let (generator, _) = generator(Err("You exceeded your current quota".to_string()));
        let err = generator
            .generate("anything", &SchemaDescription::builtin())
            .await
            .unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_empty_reply_is_no_response() {
        let err = parse_generated_query("   ").unwrap_err();
        assert!(matches!(err, IntelError::LlmParse(ref m) if m == NO_RESPONSE));
        assert!(!err.is_service_unavailable());
    }

    #[test]
    fn test_non_json_reply() {
        let err = parse_generated_query("SELECT * FROM brands").unwrap_err();
        assert!(err.to_string().starts_with(NO_RESPONSE));
    }

    #[test]
    fn test_fenced_reply_and_alias() {
        let reply = "```json\n{\"sql\": \"SELECT 1\", \"explanation\": \"one\", \"suggestedVisualization\": {\"type\": \"number\"}}\n```";
        let generated = parse_generated_query(reply).unwrap();
        assert_eq!(generated.sql, "SELECT 1");
        assert_eq!(
            generated.visualization.map(|v| v.kind),
            Some(VisualizationKind::Number)
        );
    }

    #[test]
    fn test_both_visualization_keys_prefer_primary() {
        let reply = r#"{"sql": "SELECT 1", "visualization": {"type": "pie"}, "suggestedVisualization": {"type": "bar"}}"#;
        let generated = parse_generated_query(reply).unwrap();
        assert_eq!(
            generated.visualization.map(|v| v.kind),
            Some(VisualizationKind::Pie)
        );

        let reply = r#"{"sql": "SELECT 1", "visualization": null, "suggestedVisualization": "line"}"#;
        let generated = parse_generated_query(reply).unwrap();
        assert_eq!(
            generated.visualization.map(|v| v.kind),
            Some(VisualizationKind::Line)
        );
    }

    #[test]
    fn test_sql_must_be_non_empty_string() {
        assert!(parse_generated_query(r#"{"sql": "", "explanation": "x"}"#).is_err());
        assert!(parse_generated_query(r#"{"sql": 42}"#).is_err());
        assert!(parse_generated_query(r#"{"explanation": "no sql"}"#).is_err());
    }

    #[test]
    fn test_visualization_variants() {
        let generated =
            parse_generated_query(r#"{"sql": "SELECT 1", "visualization": "analysis_post"}"#)
                .unwrap();
        assert_eq!(
            generated.visualization,
            Some(Visualization::of(VisualizationKind::AnalysisPost))
        );
        assert_eq!(generated.explanation, "");

        let generated =
            parse_generated_query(r#"{"sql": "SELECT 1", "visualization": {"type": "scatter"}}"#)
                .unwrap();
        assert_eq!(
            generated.visualization.map(|v| v.kind),
            Some(VisualizationKind::Table)
        );

        let generated =
            parse_generated_query(r#"{"sql": "SELECT 1", "visualization": {"title": "x"}}"#)
                .unwrap();
        assert!(generated.visualization.is_none());
    }

    #[test]
    fn test_visualization_serializes_with_type_field() {
        let mut viz = Visualization::of(VisualizationKind::Bar);
        viz.options.insert("xAxis".to_string(), json!("brand_name"));
        assert_eq!(
            serde_json::to_value(&viz).unwrap(),
            json!({"type": "bar", "xAxis": "brand_name"})
        );
    }
}
