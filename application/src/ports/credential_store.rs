//! Provider credential port
//!
//! The orchestrators only ever ask "is this provider enabled and
//! credentialed?" before dispatching to it.

use council_domain::{ProviderCredential, ProviderId};

/// Read-only access to provider credentials
pub trait CredentialStore: Send + Sync {
    /// Every known credential, enabled or not
    fn credentials(&self) -> Vec<ProviderCredential>;

    fn credential(&self, provider: ProviderId) -> Option<ProviderCredential> {
        self.credentials().into_iter().find(|c| c.provider == provider)
    }

    /// Enabled with a format-valid key (local providers need no key)
    fn is_usable(&self, provider: ProviderId) -> bool {
        self.credential(provider).is_some_and(|c| c.is_usable())
    }

    /// Usable providers in `ProviderId::ALL` order
    fn usable_providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.is_usable(*p))
            .collect()
    }
}
