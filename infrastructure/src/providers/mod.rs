//! Provider adapters
//!
//! One [`ProviderAdapter`] per backend wire format. The
//! [`RoutingGateway`](routing::RoutingGateway) maps provider identities to
//! adapters and normalizes their results into gateway responses.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai_compat;
pub mod routing;

use async_trait::async_trait;
use council_application::{FinishReason, QueryRequest};
use council_domain::core::registry;
use council_domain::{ModelRef, ProviderCredential, ProviderId};
use error::ProviderError;
use futures::future::join_all;
use std::sync::{PoisonError, RwLock};

/// Default output budget when the request sets none and the API requires one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One completion as reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: FinishReason,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderId;

    /// Install or replace the credential
    fn configure(&self, credential: ProviderCredential);

    /// Enabled with a format-valid credential (local providers always)
    fn is_configured(&self) -> bool;

    async fn query(&self, request: &QueryRequest) -> Result<Completion, ProviderError>;

    /// `n` independent completions. Without native support, `n` parallel
    /// single completions.
    async fn query_multiple(&self, request: &QueryRequest, n: usize) -> Result<Vec<Completion>, ProviderError> {
        parallel_completions(self, request, n).await
    }

    fn available_models(&self) -> Vec<ModelRef> {
        let kind = self.kind();
        registry::models_for(kind).map(|m| ModelRef::new(kind, m.id)).collect()
    }

    /// Minimal round trip against the first known model
    async fn test_connection(&self) -> Result<(), ProviderError> {
        let model = self
            .available_models()
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("no known models for {}", self.kind())))?;
        let request = QueryRequest::new(model).with_user("ping").with_max_tokens(Some(1));
        self.query(&request).await.map(|_| ())
    }
}

/// Fire `n` single completions concurrently; fails if any of them fails
pub(crate) async fn parallel_completions<A: ProviderAdapter + ?Sized>(
    adapter: &A,
    request: &QueryRequest,
    n: usize,
) -> Result<Vec<Completion>, ProviderError> {
    join_all((0..n).map(|_| adapter.query(request)))
        .await
        .into_iter()
        .collect()
}

/// Credential holder shared by the adapters
#[derive(Debug, Default)]
pub(crate) struct CredentialSlot(RwLock<Option<ProviderCredential>>);

impl CredentialSlot {
    pub(crate) fn set(&self, credential: ProviderCredential) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    /// The credential, only if it is usable
    pub(crate) fn usable(&self) -> Option<ProviderCredential> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(ProviderCredential::is_usable)
    }

    /// Usable credential or `NotConfigured`
    pub(crate) fn require(&self, provider: ProviderId) -> Result<ProviderCredential, ProviderError> {
        self.usable().ok_or(ProviderError::NotConfigured(provider))
    }
}

/// `base_url` joined with `path`, tolerating a trailing slash
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
