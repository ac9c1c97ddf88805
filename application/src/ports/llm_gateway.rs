//! LLM Gateway port
//!
//! Defines the interface for querying LLM providers. One call in, one
//! normalized response out, whatever the provider's wire format.

use async_trait::async_trait;
use council_domain::core::registry;
use council_domain::{ModelRef, ProviderId};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Provider not configured: {0}")]
    NotConfigured(ProviderId),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub model: ModelRef,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl QueryRequest {
    pub fn new(model: ModelRef) -> Self {
        Self {
            model,
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    /// Add a system message only when one is given
    pub fn with_optional_system(self, content: Option<String>) -> Self {
        match content {
            Some(content) => self.with_system(content),
            None => self,
        }
    }

    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_optional_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Concatenated system messages, for providers with a separate system field
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Token usage and the cost derived from it
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
}

impl TokenUsage {
    /// Usage for `model_id`, priced from the model registry
    pub fn priced(model_id: &str, input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost: registry::compute_cost(model_id, input_tokens, output_tokens),
        }
    }

    /// Field-wise sum
    pub fn add(self, other: TokenUsage) -> Self {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            cost: self.cost + other.cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Length,
    Error,
}

/// Normalized response. Failures are values, never panics or `Err`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub id: String,
    pub model: String,
    pub provider: ProviderId,
    pub content: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn success(model: &ModelRef, content: impl Into<String>, usage: TokenUsage, latency_ms: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.model_id.clone(),
            provider: model.provider,
            content: content.into(),
            usage,
            latency_ms,
            finish_reason: FinishReason::Stop,
            error: None,
        }
    }

    /// Error-shaped response carrying a human-readable message
    pub fn failure(model: &ModelRef, error: impl ToString, latency_ms: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.model_id.clone(),
            provider: model.provider,
            content: String::new(),
            usage: TokenUsage::default(),
            latency_ms,
            finish_reason: FinishReason::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    pub fn is_error(&self) -> bool {
        self.finish_reason == FinishReason::Error
    }

    /// The error message, if this is an error response
    pub fn error_message(&self) -> Option<String> {
        if !self.is_error() {
            return None;
        }
        Some(self.error.clone().unwrap_or_else(|| "unknown error".to_string()))
    }
}

/// Request for `n` independent completions of the same prompt
#[derive(Debug, Clone, PartialEq)]
pub struct MultiQueryRequest {
    pub request: QueryRequest,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiQueryResponse {
    pub id: String,
    pub model: String,
    pub provider: ProviderId,
    pub contents: Vec<String>,
    pub usage: TokenUsage,
    /// Wall-clock span of the whole batch
    pub latency_ms: u64,
}

/// One failed model inside a parallel batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: String,
    pub provider: ProviderId,
    pub error: String,
}

/// Result of [`LlmGateway::query_parallel`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelQueryResult {
    /// One response per requested model, in request order
    pub responses: Vec<QueryResponse>,
    pub errors: Vec<ModelFailure>,
    /// Wall-clock span of the batch
    pub total_latency_ms: u64,
    pub total_cost: f64,
}

impl ParallelQueryResult {
    /// Collect responses of a batch that took `total_latency_ms`
    pub fn from_responses(responses: Vec<QueryResponse>, total_latency_ms: u64) -> Self {
        let errors = responses
            .iter()
            .filter_map(|r| {
                r.error_message().map(|error| ModelFailure {
                    model: r.model.clone(),
                    provider: r.provider,
                    error,
                })
            })
            .collect();
        let total_cost = responses.iter().map(|r| r.usage.cost).sum();

        Self {
            responses,
            errors,
            total_latency_ms,
            total_cost,
        }
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send one request. Never fails: transport errors, HTTP errors and
    /// unconfigured providers come back as `FinishReason::Error` responses.
    async fn query(&self, request: QueryRequest) -> QueryResponse;

    /// Request `n` completions. Unlike [`query`](Self::query), this may fail.
    async fn query_multiple(&self, request: MultiQueryRequest) -> Result<MultiQueryResponse, GatewayError>;

    /// Whether `provider` has a usable credential
    fn is_configured(&self, provider: ProviderId) -> bool;

    /// Models the gateway can route to
    fn available_models(&self) -> Vec<ModelRef>;

    /// Query every model concurrently with the same prompt and wait for all.
    async fn query_parallel(
        &self,
        models: &[ModelRef],
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> ParallelQueryResult {
        let started = Instant::now();

        let requests = models.iter().map(|model| {
            let request = QueryRequest::new(model.clone())
                .with_optional_system(system_prompt.map(str::to_string))
                .with_user(prompt);
            self.query(request)
        });
        let responses = join_all(requests).await;

        ParallelQueryResult::from_responses(responses, started.elapsed().as_millis() as u64)
    }
}
