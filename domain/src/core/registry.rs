//! Static model registry: provider resolution and pricing
//!
//! The registry maps a model id to its provider, context window, per-1k-token
//! prices and capabilities. Ids missing from the table are resolved to a
//! provider by naming convention, and cost nothing.

use super::model::ProviderId;
use serde::Serialize;

/// What a model can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Vision,
    Reasoning,
    LongContext,
    /// Native `n` parameter for multiple completions in one request
    MultiCompletion,
}

/// Registry entry for one model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub provider: ProviderId,
    pub context_window: u32,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
    pub capabilities: &'static [Capability],
}

impl ModelInfo {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

use Capability::*;

const MODELS: &[ModelInfo] = &[
    // OpenAI
    ModelInfo {
        id: "gpt-4o",
        provider: ProviderId::OpenAi,
        context_window: 128_000,
        cost_per_1k_input: 0.0025,
        cost_per_1k_output: 0.01,
        capabilities: &[Chat, Vision, MultiCompletion],
    },
    ModelInfo {
        id: "gpt-4o-mini",
        provider: ProviderId::OpenAi,
        context_window: 128_000,
        cost_per_1k_input: 0.00015,
        cost_per_1k_output: 0.0006,
        capabilities: &[Chat, Vision, MultiCompletion],
    },
    ModelInfo {
        id: "gpt-4.1",
        provider: ProviderId::OpenAi,
        context_window: 1_047_576,
        cost_per_1k_input: 0.002,
        cost_per_1k_output: 0.008,
        capabilities: &[Chat, Vision, LongContext, MultiCompletion],
    },
    ModelInfo {
        id: "o3-mini",
        provider: ProviderId::OpenAi,
        context_window: 200_000,
        cost_per_1k_input: 0.0011,
        cost_per_1k_output: 0.0044,
        capabilities: &[Chat, Reasoning],
    },
    // Anthropic
    ModelInfo {
        id: "claude-3-5-sonnet-20241022",
        provider: ProviderId::Anthropic,
        context_window: 200_000,
        cost_per_1k_input: 0.003,
        cost_per_1k_output: 0.015,
        capabilities: &[Chat, Vision, LongContext],
    },
    ModelInfo {
        id: "claude-3-5-haiku-20241022",
        provider: ProviderId::Anthropic,
        context_window: 200_000,
        cost_per_1k_input: 0.0008,
        cost_per_1k_output: 0.004,
        capabilities: &[Chat, LongContext],
    },
    ModelInfo {
        id: "claude-3-opus-20240229",
        provider: ProviderId::Anthropic,
        context_window: 200_000,
        cost_per_1k_input: 0.015,
        cost_per_1k_output: 0.075,
        capabilities: &[Chat, Vision, LongContext],
    },
    // Google
    ModelInfo {
        id: "gemini-1.5-pro",
        provider: ProviderId::Google,
        context_window: 2_000_000,
        cost_per_1k_input: 0.00125,
        cost_per_1k_output: 0.005,
        capabilities: &[Chat, Vision, LongContext],
    },
    ModelInfo {
        id: "gemini-1.5-flash",
        provider: ProviderId::Google,
        context_window: 1_000_000,
        cost_per_1k_input: 0.000075,
        cost_per_1k_output: 0.0003,
        capabilities: &[Chat, Vision, LongContext],
    },
    ModelInfo {
        id: "gemini-2.0-flash",
        provider: ProviderId::Google,
        context_window: 1_000_000,
        cost_per_1k_input: 0.0001,
        cost_per_1k_output: 0.0004,
        capabilities: &[Chat, Vision, LongContext],
    },
    // Groq
    ModelInfo {
        id: "llama-3.3-70b-versatile",
        provider: ProviderId::Groq,
        context_window: 128_000,
        cost_per_1k_input: 0.00059,
        cost_per_1k_output: 0.00079,
        capabilities: &[Chat],
    },
    ModelInfo {
        id: "llama-3.1-8b-instant",
        provider: ProviderId::Groq,
        context_window: 128_000,
        cost_per_1k_input: 0.00005,
        cost_per_1k_output: 0.00008,
        capabilities: &[Chat],
    },
    // Mistral
    ModelInfo {
        id: "mistral-large-latest",
        provider: ProviderId::Mistral,
        context_window: 128_000,
        cost_per_1k_input: 0.002,
        cost_per_1k_output: 0.006,
        capabilities: &[Chat],
    },
    ModelInfo {
        id: "mistral-small-latest",
        provider: ProviderId::Mistral,
        context_window: 32_000,
        cost_per_1k_input: 0.0002,
        cost_per_1k_output: 0.0006,
        capabilities: &[Chat],
    },
    // DeepSeek
    ModelInfo {
        id: "deepseek-chat",
        provider: ProviderId::DeepSeek,
        context_window: 64_000,
        cost_per_1k_input: 0.00027,
        cost_per_1k_output: 0.0011,
        capabilities: &[Chat],
    },
    ModelInfo {
        id: "deepseek-reasoner",
        provider: ProviderId::DeepSeek,
        context_window: 64_000,
        cost_per_1k_input: 0.00055,
        cost_per_1k_output: 0.00219,
        capabilities: &[Chat, Reasoning],
    },
    // OpenRouter
    ModelInfo {
        id: "meta-llama/llama-3.1-405b-instruct",
        provider: ProviderId::OpenRouter,
        context_window: 128_000,
        cost_per_1k_input: 0.0027,
        cost_per_1k_output: 0.0027,
        capabilities: &[Chat],
    },
    // Ollama (local, free)
    ModelInfo {
        id: "llama3.2:latest",
        provider: ProviderId::Ollama,
        context_window: 128_000,
        cost_per_1k_input: 0.0,
        cost_per_1k_output: 0.0,
        capabilities: &[Chat],
    },
];

/// All registered models
pub fn all_models() -> &'static [ModelInfo] {
    MODELS
}

/// Look up a model by exact id
pub fn lookup(model_id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == model_id)
}

/// Registered models served by a provider
pub fn models_for(provider: ProviderId) -> impl Iterator<Item = &'static ModelInfo> {
    MODELS.iter().filter(move |m| m.provider == provider)
}

/// Resolve the provider serving `model_id`.
///
/// Registry entries win; unknown ids fall back to naming conventions.
pub fn resolve_provider(model_id: &str) -> ProviderId {
    lookup(model_id)
        .map(|m| m.provider)
        .unwrap_or_else(|| infer_provider(model_id))
}

/// Infer a provider from the shape of a model id.
///
/// Prefix conventions first, then the provider-qualifier delimiters:
/// `vendor/model` is routed through OpenRouter and `name:tag` through Ollama.
/// Anything else goes to OpenAI.
pub fn infer_provider(model_id: &str) -> ProviderId {
    let id = model_id.trim().to_lowercase();

    if id.contains('/') {
        return ProviderId::OpenRouter;
    }
    if id.starts_with("gpt-")
        || id.starts_with("o1")
        || id.starts_with("o3")
        || id.starts_with("o4")
        || id.starts_with("chatgpt")
    {
        return ProviderId::OpenAi;
    }
    if id.starts_with("claude") {
        return ProviderId::Anthropic;
    }
    if id.starts_with("gemini") {
        return ProviderId::Google;
    }
    if id.starts_with("mistral") || id.starts_with("mixtral") || id.starts_with("codestral") {
        return ProviderId::Mistral;
    }
    if id.starts_with("deepseek") {
        return ProviderId::DeepSeek;
    }
    if id.contains(':') {
        return ProviderId::Ollama;
    }
    ProviderId::OpenAi
}

/// Cost of a call in USD. Unknown models cost 0.
pub fn compute_cost(model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    match lookup(model_id) {
        Some(info) => {
            (input_tokens as f64 / 1000.0) * info.cost_per_1k_input
                + (output_tokens as f64 / 1000.0) * info.cost_per_1k_output
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_model() {
        let info = lookup("gpt-4o").unwrap();
        assert_eq!(info.provider, ProviderId::OpenAi);
        assert!(info.has_capability(Capability::MultiCompletion));
    }

    #[test]
    fn test_registry_ids_are_unique() {
        let mut ids: Vec<_> = all_models().iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all_models().len());
    }

    #[test]
    fn test_registry_wins_over_patterns() {
        // Registered under Groq even though the pattern rules would say OpenAI
        assert_eq!(resolve_provider("llama-3.3-70b-versatile"), ProviderId::Groq);
    }

    #[test]
    fn test_infer_provider_prefixes() {
        assert_eq!(infer_provider("gpt-5-preview"), ProviderId::OpenAi);
        assert_eq!(infer_provider("o1-mini"), ProviderId::OpenAi);
        assert_eq!(infer_provider("claude-4-opus"), ProviderId::Anthropic);
        assert_eq!(infer_provider("gemini-2.5-pro"), ProviderId::Google);
        assert_eq!(infer_provider("codestral-latest"), ProviderId::Mistral);
        assert_eq!(infer_provider("deepseek-coder"), ProviderId::DeepSeek);
    }

    #[test]
    fn test_infer_provider_delimiters() {
        assert_eq!(infer_provider("anthropic/claude-3.5-sonnet"), ProviderId::OpenRouter);
        assert_eq!(infer_provider("qwen2.5:7b"), ProviderId::Ollama);
        assert_eq!(infer_provider("something-else"), ProviderId::OpenAi);
    }

    #[test]
    fn test_compute_cost() {
        // gpt-4o: 0.0025 in, 0.01 out per 1k
        let cost = compute_cost("gpt-4o", 2000, 1000);
        assert!((cost - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model_costs_nothing() {
        assert_eq!(compute_cost("mystery-model", 10_000, 10_000), 0.0);
    }

    #[test]
    fn test_models_for_provider() {
        assert!(models_for(ProviderId::Anthropic).all(|m| m.provider == ProviderId::Anthropic));
        assert!(models_for(ProviderId::Google).count() >= 2);
    }
}
