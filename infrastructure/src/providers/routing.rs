use super::anthropic::AnthropicAdapter;
use super::error::ProviderError;
use super::gemini::GeminiAdapter;
use super::openai_compat::OpenAiCompatAdapter;
use super::{Completion, ProviderAdapter};
use async_trait::async_trait;
use council_application::{
    GatewayError, LlmGateway, MultiQueryRequest, MultiQueryResponse, QueryRequest, QueryResponse, TokenUsage,
};
use council_domain::{ModelRef, ProviderCredential, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Gateway that dispatches each request to the adapter of its model's provider
pub struct RoutingGateway {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl RoutingGateway {
    /// Later adapters replace earlier ones of the same kind
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.kind(), a)).collect(),
        }
    }

    /// One adapter per known provider, sharing one HTTP client
    pub fn with_default_adapters(client: reqwest::Client) -> Self {
        let adapters: Vec<Arc<dyn ProviderAdapter>> = ProviderId::ALL
            .into_iter()
            .map(|provider| -> Arc<dyn ProviderAdapter> {
                match provider {
                    ProviderId::Anthropic => Arc::new(AnthropicAdapter::new(client.clone())),
                    ProviderId::Google => Arc::new(GeminiAdapter::new(client.clone())),
                    other => Arc::new(OpenAiCompatAdapter::new(other, client.clone())),
                }
            })
            .collect();
        Self::new(adapters)
    }

    /// Hand each credential to its adapter
    pub fn configure(&self, credentials: &[ProviderCredential]) {
        for credential in credentials {
            match self.adapters.get(&credential.provider) {
                Some(adapter) => adapter.configure(credential.clone()),
                None => warn!("No adapter for provider {}", credential.provider),
            }
        }
    }

    /// Providers with an adapter, in `ProviderId::ALL` order
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.adapters.contains_key(p))
            .collect()
    }

    /// Round-trip a minimal request to `provider`
    pub async fn test_connection(&self, provider: ProviderId) -> Result<(), GatewayError> {
        let adapter = self.configured_adapter(provider)?;
        adapter.test_connection().await.map_err(GatewayError::from)
    }

    fn configured_adapter(&self, provider: ProviderId) -> Result<&Arc<dyn ProviderAdapter>, ProviderError> {
        self.adapters
            .get(&provider)
            .filter(|a| a.is_configured())
            .ok_or(ProviderError::NotConfigured(provider))
    }
}

fn usage_of(model_id: &str, completions: &[Completion]) -> TokenUsage {
    completions
        .iter()
        .map(|c| TokenUsage::priced(model_id, c.input_tokens, c.output_tokens))
        .fold(TokenUsage::default(), TokenUsage::add)
}

#[async_trait]
impl LlmGateway for RoutingGateway {
    async fn query(&self, request: QueryRequest) -> QueryResponse {
        let model = request.model.clone();
        let adapter = match self.configured_adapter(model.provider) {
            Ok(adapter) => adapter,
            Err(e) => return QueryResponse::failure(&model, GatewayError::from(e), 0),
        };

        let started = Instant::now();
        let result = adapter.query(&request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(completion) => {
                debug!("{} answered in {}ms", model, latency_ms);
                let usage = TokenUsage::priced(&model.model_id, completion.input_tokens, completion.output_tokens);
                QueryResponse::success(&model, completion.content, usage, latency_ms)
                    .with_finish_reason(completion.finish_reason)
            }
            Err(e) => {
                warn!("{} failed after {}ms: {}", model, latency_ms, e);
                QueryResponse::failure(&model, GatewayError::from(e), latency_ms)
            }
        }
    }

    async fn query_multiple(&self, request: MultiQueryRequest) -> Result<MultiQueryResponse, GatewayError> {
        let model = request.request.model.clone();
        let adapter = self.configured_adapter(model.provider)?;

        let started = Instant::now();
        let completions = adapter.query_multiple(&request.request, request.n).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        Ok(MultiQueryResponse {
            id: uuid::Uuid::new_v4().to_string(),
            usage: usage_of(&model.model_id, &completions),
            contents: completions.into_iter().map(|c| c.content).collect(),
            model: model.model_id,
            provider: model.provider,
            latency_ms,
        })
    }

    fn is_configured(&self, provider: ProviderId) -> bool {
        self.configured_adapter(provider).is_ok()
    }

    fn available_models(&self) -> Vec<ModelRef> {
        self.providers()
            .into_iter()
            .filter_map(|p| self.adapters.get(&p))
            .filter(|a| a.is_configured())
            .flat_map(|a| a.available_models())
            .collect()
    }
}
