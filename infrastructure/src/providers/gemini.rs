//! Google Gemini `generateContent` adapter

use super::error::{ProviderError, ensure_success};
use super::{Completion, CredentialSlot, ProviderAdapter, endpoint};
use async_trait::async_trait;
use council_application::{FinishReason, QueryRequest, Role};
use council_domain::{ProviderCredential, ProviderId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub struct GeminiAdapter {
    client: reqwest::Client,
    credential: CredentialSlot,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            credential: CredentialSlot::default(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderId {
        ProviderId::Google
    }

    fn configure(&self, credential: ProviderCredential) {
        self.credential.set(credential);
    }

    fn is_configured(&self) -> bool {
        self.credential.usable().is_some()
    }

    async fn query(&self, request: &QueryRequest) -> Result<Completion, ProviderError> {
        let credential = self.credential.require(ProviderId::Google)?;
        let path = format!("models/{}:generateContent", request.model.model_id);
        let url = endpoint(credential.effective_base_url(), &path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.api_key.trim())
            .json(&build_body(request))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_response(body)
    }
}

// ==================== Wire Format ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini calls the assistant role `model` and takes system text separately
pub(crate) fn build_body(request: &QueryRequest) -> Value {
    let contents: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if let Some(system) = request.system_text() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }

    let mut generation = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        generation.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = request.max_tokens {
        generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }
    body
}

pub(crate) fn parse_response(response: GenerateResponse) -> Result<Completion, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no candidates in response".to_string()))?;
    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    let (input_tokens, output_tokens) = response
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or_default();

    Ok(Completion {
        content,
        input_tokens,
        output_tokens,
        finish_reason: match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => FinishReason::Length,
            _ => FinishReason::Stop,
        },
    })
}
