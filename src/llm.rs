use crate::error::{IntelError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// One system + user prompt pair with sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the service for a JSON object response
    pub json_mode: bool,
}

/// Anything that turns a prompt pair into completion text.
///
/// Implementations report outages as [`IntelError::Llm`] with a message that
/// names the API key, quota or model problem when the upstream says so.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntelError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user}
            ],
        });

        // Reasoning models reject custom temperatures and spend extra tokens thinking
        if is_reasoning_model(&self.model) {
            body["max_completion_tokens"] = serde_json::json!(request.max_tokens.max(2000));
        } else if self.model.starts_with("gpt-4") {
            body["temperature"] = serde_json::json!(request.temperature);
            body["max_completion_tokens"] = serde_json::json!(request.max_tokens);
        } else {
            body["temperature"] = serde_json::json!(request.temperature);
            body["max_tokens"] = serde_json::json!(request.max_tokens);
        }

        if request.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }
}

fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3")
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if self.api_key.trim().is_empty() {
            return Err(IntelError::Llm(
                "OpenAI API key is not configured (set OPENAI_API_KEY)".to_string(),
            ));
        }

        let body = self.build_body(request);
        debug!(model = %self.model, json_mode = request.json_mode, "Calling completion service");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IntelError::Llm(format!("LLM API call to model {} timed out", self.model))
                } else {
                    IntelError::Llm(format!("LLM API call failed: {}", e))
                }
            })?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status.as_u16(), &self.model, &error_text));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IntelError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        // Check for error in response
        if let Some(error) = response_json.get("error") {
            return Err(IntelError::Llm(format!("LLM API error: {}", error)));
        }

        let choice = response_json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| IntelError::Llm("No choices in LLM response from model".to_string()))?;

        if let Some(finish_reason) = choice.get("finish_reason").and_then(|r| r.as_str()) {
            if finish_reason == "length" {
                warn!("LLM response was truncated due to length limit");
            } else if finish_reason == "content_filter" {
                return Err(IntelError::Llm(
                    "LLM response was filtered by the model's content policy".to_string(),
                ));
            }
        }

        // Missing content is a bad completion, not an outage; callers decide
        Ok(choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

/// Map an upstream HTTP failure to a message carrying a recognizable marker.
fn classify_status(status: u16, model: &str, error_text: &str) -> IntelError {
    let message = match status {
        401 | 403 => format!("Invalid or unauthorized API key ({}): {}", status, error_text),
        429 => format!("Rate limit or quota exceeded ({}): {}", status, error_text),
        404 => format!("The model {} is not available ({}): {}", model, status, error_text),
        _ => format!("LLM API error from model {} ({}): {}", model, status, error_text),
    };
    IntelError::Llm(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str) -> LlmClient {
        LlmClient::new(
            "sk-test".to_string(),
            model.to_string(),
            "https://api.openai.com/v1/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request(json_mode: bool) -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            user: "user".to_string(),
            temperature: 0.1,
            max_tokens: 800,
            json_mode,
        }
    }

    #[test]
    fn test_body_for_gpt4_family() {
        let body = client("gpt-4o").build_body(&request(true));
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_completion_tokens"], 800);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn test_body_for_reasoning_model() {
        let body = client("o1-mini").build_body(&request(false));
        assert_eq!(body["max_completion_tokens"], 2000);
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_body_for_legacy_model() {
        let body = client("gpt-3.5-turbo").build_body(&request(false));
        assert_eq!(body["max_tokens"], 800);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client("gpt-4o").base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_status_classification_markers() {
        let msg = classify_status(401, "gpt-4o", "bad key").to_string();
        assert!(msg.contains("API key"));
        let msg = classify_status(429, "gpt-4o", "slow down").to_string();
        assert!(msg.contains("quota"));
        let msg = classify_status(404, "gpt-9", "nope").to_string();
        assert!(msg.contains("model"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_service_error() {
        let client = LlmClient::new(
            String::new(),
            "gpt-4o".to_string(),
            "https://api.openai.com/v1".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client.complete(&request(true)).await.unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(err.to_string().contains("API key"));
    }
}
