//! Provider credentials.
//!
//! A provider is usable for dispatch only when it is enabled and carries a
//! non-empty, format-valid API key. Local providers need no key.

use crate::core::model::ProviderId;

/// One provider's credential record, as read from the credential store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCredential {
    pub provider: ProviderId,
    pub api_key: String,
    /// Base URL override (e.g. a proxy or a remote Ollama host).
    pub base_url: Option<String>,
    pub is_enabled: bool,
}

impl ProviderCredential {
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: None,
            is_enabled: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// Base URL to dispatch to, falling back to the provider default
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    /// Whether the key is present and well-formed for this provider
    pub fn has_valid_key(&self) -> bool {
        is_valid_api_key(self.provider, &self.api_key)
    }

    /// Enabled and credentialed: safe to dispatch to
    pub fn is_usable(&self) -> bool {
        self.is_enabled && self.has_valid_key()
    }
}

/// Check an API key against the provider's known key format.
///
/// Local providers accept anything (including an empty key).
pub fn is_valid_api_key(provider: ProviderId, key: &str) -> bool {
    if provider.is_local() {
        return true;
    }

    let key = key.trim();
    if key.is_empty() {
        return false;
    }

    match provider {
        ProviderId::OpenAi => key.starts_with("sk-") && key.len() > 20,
        ProviderId::Anthropic => key.starts_with("sk-ant-") && key.len() > 20,
        ProviderId::Google => key.starts_with("AIza") && key.len() >= 30,
        ProviderId::Groq => key.starts_with("gsk_") && key.len() > 20,
        ProviderId::OpenRouter => key.starts_with("sk-or-") && key.len() > 20,
        ProviderId::DeepSeek => key.starts_with("sk-") && key.len() > 20,
        ProviderId::Mistral => key.len() >= 20,
        ProviderId::Ollama => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_invalid() {
        assert!(!is_valid_api_key(ProviderId::OpenAi, ""));
        assert!(!is_valid_api_key(ProviderId::Anthropic, "   "));
    }

    #[test]
    fn test_key_prefixes() {
        assert!(is_valid_api_key(ProviderId::OpenAi, "sk-proj-abcdefghijklmnopqrstuvwxyz"));
        assert!(!is_valid_api_key(ProviderId::Anthropic, "sk-proj-abcdefghijklmnopqrstuvwxyz"));
        assert!(is_valid_api_key(ProviderId::Anthropic, "sk-ant-REDACTED"));
        assert!(is_valid_api_key(ProviderId::Google, "AIzaSyA1234567890abcdefghijklmnopq"));
        assert!(is_valid_api_key(ProviderId::Groq, "gsk_abcdefghijklmnopqrstuvwxyz"));
        assert!(is_valid_api_key(ProviderId::OpenRouter, "sk-or-v1-abcdefghijklmnopqrstuv"));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        assert!(is_valid_api_key(ProviderId::Ollama, ""));
        assert!(ProviderCredential::new(ProviderId::Ollama, "").is_usable());
    }

    #[test]
    fn test_disabled_credential_is_not_usable() {
        let cred = ProviderCredential::new(ProviderId::OpenAi, "sk-abcdefghijklmnopqrstuvwxyz").disabled();
        assert!(cred.has_valid_key());
        assert!(!cred.is_usable());
    }

    #[test]
    fn test_effective_base_url() {
        let cred = ProviderCredential::new(ProviderId::Ollama, "");
        assert_eq!(cred.effective_base_url(), "http://localhost:11434/v1");

        let cred = cred.with_base_url("http://gpu-box:11434/v1");
        assert_eq!(cred.effective_base_url(), "http://gpu-box:11434/v1");
    }
}
