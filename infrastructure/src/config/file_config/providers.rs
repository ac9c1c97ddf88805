//! Provider configuration from TOML (`[providers.<id>]` sections)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[providers]` table keyed by provider id (`openai`, `groq`, `ollama`, ...)
pub type FileProvidersConfig = BTreeMap<String, FileProviderConfig>;

/// One provider's settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Environment variable holding the API key (default: the provider's usual one)
    pub api_key_env: Option<String>,
    /// Literal API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Base URL override, e.g. a proxy or a remote Ollama host
    pub base_url: Option<String>,
    pub enabled: bool,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: None,
            api_key: None,
            base_url: None,
            enabled: true,
        }
    }
}
