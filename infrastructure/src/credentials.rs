//! Credential store built from configuration and the environment

use crate::config::{FileProviderConfig, FileProvidersConfig};
use council_application::CredentialStore;
use council_domain::{ProviderCredential, ProviderId};
use tracing::debug;

/// Credentials resolved once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    credentials: Vec<ProviderCredential>,
}

impl StaticCredentialStore {
    pub fn new(credentials: Vec<ProviderCredential>) -> Self {
        Self { credentials }
    }

    /// Resolve against the process environment
    pub fn from_config(providers: &FileProvidersConfig) -> Self {
        Self::from_config_with(providers, |name| std::env::var(name).ok())
    }

    /// Resolve each provider's key: the configured (or default) environment
    /// variable first, then the literal `api_key`. Local providers are only
    /// included when they have a `[providers.<id>]` section.
    pub fn from_config_with(providers: &FileProvidersConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut credentials = Vec::new();

        for provider in ProviderId::ALL {
            let section = providers.get(provider.as_str());

            if provider.is_local() {
                if let Some(section) = section {
                    credentials.push(apply_section(ProviderCredential::new(provider, ""), section));
                }
                continue;
            }

            let env_name = section
                .and_then(|s| s.api_key_env.as_deref())
                .or(provider.default_api_key_env());
            let from_env = env_name.and_then(&env).filter(|k| !k.trim().is_empty());
            let key = from_env.or_else(|| section.and_then(|s| s.api_key.clone()));

            let Some(key) = key else {
                debug!("No API key for {}", provider);
                continue;
            };

            let mut credential = ProviderCredential::new(provider, key.trim());
            if let Some(section) = section {
                credential = apply_section(credential, section);
            }
            credentials.push(credential);
        }

        Self { credentials }
    }
}

fn apply_section(mut credential: ProviderCredential, section: &FileProviderConfig) -> ProviderCredential {
    if let Some(base_url) = section.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        credential = credential.with_base_url(base_url.trim());
    }
    if !section.enabled {
        credential = credential.disabled();
    }
    credential
}

impl CredentialStore for StaticCredentialStore {
    fn credentials(&self) -> Vec<ProviderCredential> {
        self.credentials.clone()
    }
}
