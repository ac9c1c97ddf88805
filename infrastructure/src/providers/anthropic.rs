//! Anthropic Messages API adapter

use super::error::{ProviderError, ensure_success};
use super::{Completion, CredentialSlot, DEFAULT_MAX_TOKENS, ProviderAdapter, endpoint};
use async_trait::async_trait;
use council_application::{FinishReason, QueryRequest, Role};
use council_domain::{ProviderCredential, ProviderId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: reqwest::Client,
    credential: CredentialSlot,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            credential: CredentialSlot::default(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn configure(&self, credential: ProviderCredential) {
        self.credential.set(credential);
    }

    fn is_configured(&self) -> bool {
        self.credential.usable().is_some()
    }

    async fn query(&self, request: &QueryRequest) -> Result<Completion, ProviderError> {
        let credential = self.credential.require(ProviderId::Anthropic)?;
        let url = endpoint(credential.effective_base_url(), "messages");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", credential.api_key.trim())
            .header("anthropic-version", API_VERSION)
            .json(&build_body(request))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_response(body)
    }
}

// ==================== Wire Format ====================

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// System messages move to the top-level `system` field
pub(crate) fn build_body(request: &QueryRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();

    let mut body = json!({
        "model": request.model.model_id,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": messages,
    });
    if let Some(system) = request.system_text() {
        body["system"] = json!(system);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

pub(crate) fn parse_response(response: MessagesResponse) -> Result<Completion, ProviderError> {
    let text: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(ProviderError::InvalidResponse("no text content in response".to_string()));
    }
    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.input_tokens, u.output_tokens))
        .unwrap_or_default();

    Ok(Completion {
        content: text.join(""),
        input_tokens,
        output_tokens,
        finish_reason: match response.stop_reason.as_deref() {
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Stop,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::ModelRef;

    #[test]
    fn test_build_body_lifts_system() {
        let request = QueryRequest::new(ModelRef::new(ProviderId::Anthropic, "claude-3-5-haiku-20241022"))
            .with_system("you rank answers")
            .with_user("rank these");
        let body = build_body(&request);

        assert_eq!(body["system"], "you rank answers");
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_build_body_without_system() {
        let request = QueryRequest::new(ModelRef::new(ProviderId::Anthropic, "claude-3-5-haiku-20241022"))
            .with_user("hi")
            .with_max_tokens(Some(10));
        let body = build_body(&request);
        assert!(body.get("system").is_none());
        assert_eq!(body["max_tokens"], 10);
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "type": "message",
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "world"}
            ],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 9, "output_tokens": 4}
        }"#;
        let completion = parse_response(serde_json::from_str(raw).unwrap()).unwrap();

        assert_eq!(completion.content, "Hello, world");
        assert_eq!(completion.input_tokens, 9);
        assert_eq!(completion.output_tokens, 4);
        assert_eq!(completion.finish_reason, FinishReason::Length);
    }

    #[test]
    fn test_parse_response_without_text() {
        let raw = r#"{"content": [], "stop_reason": "end_turn"}"#;
        assert!(parse_response(serde_json::from_str(raw).unwrap()).is_err());
    }
}
