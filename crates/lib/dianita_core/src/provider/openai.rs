//! OpenAI Responses API client.

use async_trait::async_trait;
use serde_json::json;

use super::sources::{ProviderResponse, collect_output_text, extract_web_sources};
use super::{Completion, CompletionProvider, CompletionRequest, ProviderError};

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the OpenAI Responses API.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (proxies, test servers).
    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }
}

/// Build the Responses API request body. The search tool and the source
/// include-path are attached only when the caller enabled web search.
fn build_request_body(model: &str, request: &CompletionRequest) -> serde_json::Value {
    let mut input = Vec::with_capacity(request.turns.len() + 1);
    input.push(json!({"role": "system", "content": request.system_prompt}));
    for turn in &request.turns {
        input.push(json!({"role": turn.role.as_str(), "content": turn.text}));
    }

    let mut body = json!({
        "model": model,
        "input": input,
        "text": {"verbosity": "low"},
    });
    if request.web_search {
        body["tools"] = json!([{"type": "web_search"}]);
        body["include"] = json!(["web_search_call.action.sources"]);
    }
    body
}

/// Pull a human-readable message out of an API error body, falling back to
/// the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let body = build_request_body(&self.model, &request);

        let response = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(Completion {
            text: collect_output_text(&parsed),
            sources: extract_web_sources(&parsed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatTurn, TurnRole};

    fn request(web_search: bool) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "Be brief.".to_string(),
            turns: vec![
                ChatTurn {
                    role: TurnRole::User,
                    text: "hi".to_string(),
                },
                ChatTurn {
                    role: TurnRole::Assistant,
                    text: "hello".to_string(),
                },
            ],
            web_search,
        }
    }

    #[test]
    fn body_orders_system_then_turns() {
        let body = build_request_body("gpt-5.2", &request(false));
        let input = body["input"].as_array().unwrap();
        assert_eq!(input.len(), 3);
        assert_eq!(input[0]["role"], "system");
        assert_eq!(input[0]["content"], "Be brief.");
        assert_eq!(input[1]["role"], "user");
        assert_eq!(input[2]["role"], "assistant");
        assert_eq!(body["text"]["verbosity"], "low");
    }

    #[test]
    fn search_capability_is_attached_only_when_enabled() {
        let without = build_request_body("gpt-5.2", &request(false));
        assert!(without.get("tools").is_none());
        assert!(without.get("include").is_none());

        let with = build_request_body("gpt-5.2", &request(true));
        assert_eq!(with["tools"][0]["type"], "web_search");
        assert_eq!(with["include"][0], "web_search_call.action.sources");
    }

    #[test]
    fn api_error_message_prefers_structured_detail() {
        let body = r#"{"error":{"message":"Rate limit exceeded","type":"rate_limit"}}"#;
        assert_eq!(api_error_message(body), "Rate limit exceeded");
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }
}
