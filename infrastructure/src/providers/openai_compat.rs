//! OpenAI-compatible chat completions adapter
//!
//! Serves every provider that speaks `POST {base}/chat/completions`:
//! OpenAI, Groq, Mistral, DeepSeek, OpenRouter and Ollama.

use super::error::{ProviderError, ensure_success};
use super::{Completion, CredentialSlot, ProviderAdapter, endpoint, parallel_completions};
use async_trait::async_trait;
use council_application::{FinishReason, QueryRequest};
use council_domain::{ProviderCredential, ProviderId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub struct OpenAiCompatAdapter {
    provider: ProviderId,
    client: reqwest::Client,
    credential: CredentialSlot,
}

impl OpenAiCompatAdapter {
    pub fn new(provider: ProviderId, client: reqwest::Client) -> Self {
        let credential = CredentialSlot::default();
        if provider.is_local() {
            credential.set(ProviderCredential::new(provider, ""));
        }
        Self {
            provider,
            client,
            credential,
        }
    }

    /// Whether the API accepts `n > 1` in one request
    fn supports_native_n(&self) -> bool {
        self.provider == ProviderId::OpenAi
    }

    async fn send(&self, body: Value) -> Result<ChatResponse, ProviderError> {
        let credential = self.credential.require(self.provider)?;
        let url = endpoint(credential.effective_base_url(), "chat/completions");
        debug!("POST {} ({})", url, self.provider);

        let mut builder = self.client.post(&url).json(&body);
        if !credential.api_key.trim().is_empty() {
            builder = builder.bearer_auth(credential.api_key.trim());
        }
        let response = ensure_success(builder.send().await?).await?;
        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn kind(&self) -> ProviderId {
        self.provider
    }

    fn configure(&self, credential: ProviderCredential) {
        self.credential.set(credential);
    }

    fn is_configured(&self) -> bool {
        self.credential.usable().is_some()
    }

    async fn query(&self, request: &QueryRequest) -> Result<Completion, ProviderError> {
        let response = self.send(build_body(request, 1)).await?;
        parse_response(response)?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }

    async fn query_multiple(&self, request: &QueryRequest, n: usize) -> Result<Vec<Completion>, ProviderError> {
        if !self.supports_native_n() || n <= 1 {
            return parallel_completions(self, request, n).await;
        }
        parse_response(self.send(build_body(request, n)).await?)
    }
}

// ==================== Wire Format ====================

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

pub(crate) fn build_body(request: &QueryRequest, n: usize) -> Value {
    let mut body = json!({
        "model": request.model.model_id,
        "messages": request.messages,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if n > 1 {
        body["n"] = json!(n);
    }
    body
}

/// One completion per choice. Usage is reported once per request, so it
/// goes to the first completion.
pub(crate) fn parse_response(response: ChatResponse) -> Result<Vec<Completion>, ProviderError> {
    if response.choices.is_empty() {
        return Err(ProviderError::InvalidResponse("no choices in response".to_string()));
    }
    let (input, output) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(response
        .choices
        .into_iter()
        .enumerate()
        .map(|(i, choice)| Completion {
            content: choice.message.content.unwrap_or_default(),
            input_tokens: if i == 0 { input } else { 0 },
            output_tokens: if i == 0 { output } else { 0 },
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                _ => FinishReason::Stop,
            },
        })
        .collect())
}
