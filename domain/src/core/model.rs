//! Provider identity and model reference value objects

use serde::{Deserialize, Serialize};

/// LLM backend identity (Value Object)
///
/// Closed set of providers known at compile time. The string form is the
/// identifier used in configuration files and planner JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
    Groq,
    Mistral,
    DeepSeek,
    OpenRouter,
    Ollama,
}

impl ProviderId {
    /// Every provider, in display order
    pub const ALL: [ProviderId; 8] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Google,
        ProviderId::Groq,
        ProviderId::Mistral,
        ProviderId::DeepSeek,
        ProviderId::OpenRouter,
        ProviderId::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Google => "google",
            ProviderId::Groq => "groq",
            ProviderId::Mistral => "mistral",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Anthropic => "Anthropic",
            ProviderId::Google => "Google Gemini",
            ProviderId::Groq => "Groq",
            ProviderId::Mistral => "Mistral",
            ProviderId::DeepSeek => "DeepSeek",
            ProviderId::OpenRouter => "OpenRouter",
            ProviderId::Ollama => "Ollama",
        }
    }

    /// Local providers need no credential and are always considered configured
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderId::Ollama)
    }

    /// Default environment variable holding this provider's API key
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("OPENAI_API_KEY"),
            ProviderId::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderId::Google => Some("GEMINI_API_KEY"),
            ProviderId::Groq => Some("GROQ_API_KEY"),
            ProviderId::Mistral => Some("MISTRAL_API_KEY"),
            ProviderId::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderId::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderId::Ollama => None,
        }
    }

    /// Default API base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "https://api.openai.com/v1",
            ProviderId::Anthropic => "https://api.anthropic.com/v1",
            ProviderId::Google => "https://generativelanguage.googleapis.com/v1beta",
            ProviderId::Groq => "https://api.groq.com/openai/v1",
            ProviderId::Mistral => "https://api.mistral.ai/v1",
            ProviderId::DeepSeek => "https://api.deepseek.com/v1",
            ProviderId::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderId::Ollama => "http://localhost:11434/v1",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" => Ok(ProviderId::Anthropic),
            "google" | "gemini" => Ok(ProviderId::Google),
            "groq" => Ok(ProviderId::Groq),
            "mistral" => Ok(ProviderId::Mistral),
            "deepseek" => Ok(ProviderId::DeepSeek),
            "openrouter" => Ok(ProviderId::OpenRouter),
            "ollama" => Ok(ProviderId::Ollama),
            other => Err(format!(
                "Unknown provider: {}. Valid: openai, anthropic, google, groq, mistral, deepseek, openrouter, ollama",
                other
            )),
        }
    }
}

/// Identifies exactly one queryable model
///
/// # Example
///
/// ```
/// use council_domain::{ModelRef, ProviderId};
///
/// let model = ModelRef::new(ProviderId::Anthropic, "claude-3-5-sonnet-20241022");
/// assert_eq!(model.to_string(), "anthropic/claude-3-5-sonnet-20241022");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: ProviderId,
    pub model_id: String,
}

impl ModelRef {
    pub fn new(provider: ProviderId, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    /// Build a reference from a bare model id, resolving the provider
    /// through the model registry (with pattern fallback).
    pub fn from_model_id(model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let provider = crate::core::registry::resolve_provider(&model_id);
        Self { provider, model_id }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_roundtrip() {
        for provider in ProviderId::ALL {
            let parsed: ProviderId = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("Gemini".parse::<ProviderId>().ok(), Some(ProviderId::Google));
        assert!("nope".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_serde_lowercase() {
        let json = serde_json::to_string(&ProviderId::OpenRouter).unwrap();
        assert_eq!(json, "\"openrouter\"");
        let back: ProviderId = serde_json::from_str("\"deepseek\"").unwrap();
        assert_eq!(back, ProviderId::DeepSeek);
    }

    #[test]
    fn test_only_ollama_is_local() {
        assert!(ProviderId::Ollama.is_local());
        assert!(ProviderId::Ollama.default_api_key_env().is_none());
        assert!(!ProviderId::OpenAi.is_local());
    }

    #[test]
    fn test_model_ref_from_model_id() {
        let model = ModelRef::from_model_id("claude-3-5-haiku-20241022");
        assert_eq!(model.provider, ProviderId::Anthropic);
    }
}
