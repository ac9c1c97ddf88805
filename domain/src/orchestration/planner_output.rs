//! Best-effort extraction of the planner's JSON wave plan
//!
//! The planner is a language model, so its output format is not
//! guaranteed. Parsing either yields a usable plan or `None`; callers fall
//! back to [`heuristic_plan`] on `None`.

use crate::core::model::{ModelRef, ProviderId};
use crate::core::registry;
use serde::{Deserialize, Serialize};

/// Upper bound on branches per wave
pub const MAX_BRANCHES: usize = 5;

/// Branches produced by the heuristic fallback
pub const HEURISTIC_BRANCHES: usize = 3;

/// One branch proposed by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedBranch {
    #[serde(default, alias = "provider_id", alias = "provider")]
    pub provider_id: String,
    #[serde(alias = "model_id", alias = "model")]
    pub model_id: String,
    pub prompt: String,
}

impl PlannedBranch {
    /// Resolve to a model reference. An unknown provider id falls back to
    /// inference from the model id.
    pub fn model_ref(&self) -> ModelRef {
        match self.provider_id.parse::<ProviderId>() {
            Ok(provider) => ModelRef::new(provider, strip_provider_prefix(provider, &self.model_id)),
            Err(_) => ModelRef::from_model_id(self.model_id.clone()),
        }
    }
}

/// Parsed planner response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerOutput {
    #[serde(default)]
    pub branches: Vec<PlannedBranch>,
    #[serde(default, alias = "merge_model")]
    pub merge_model: Option<String>,
    #[serde(default, rename = "continue")]
    pub continue_: Option<bool>,
}

impl PlannerOutput {
    /// The merge model as `provider/model` or a bare model id
    pub fn merge_model_ref(&self) -> Option<ModelRef> {
        let raw = self.merge_model.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(parse_qualified_model(raw))
    }

    /// Whether the planner asked for another wave (default: yes)
    pub fn wants_another_wave(&self) -> bool {
        self.continue_.unwrap_or(true)
    }
}

/// Parse `provider/model`; anything else is treated as a bare model id
pub fn parse_qualified_model(raw: &str) -> ModelRef {
    if let Some((provider, model)) = raw.split_once('/')
        && let Ok(provider) = provider.parse::<ProviderId>()
        && !model.is_empty()
    {
        return ModelRef::new(provider, model);
    }
    ModelRef::from_model_id(raw)
}

fn strip_provider_prefix(provider: ProviderId, model_id: &str) -> String {
    model_id
        .strip_prefix(provider.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model_id)
        .to_string()
}

/// First balanced `{...}` substring, skipping braces inside JSON strings
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the planner's raw text.
///
/// Returns `None` when no JSON object is found, it fails to parse, or it
/// has no branches.
pub fn parse_planner_output(text: &str) -> Option<PlannerOutput> {
    let json = extract_first_json_object(text)?;
    let output: PlannerOutput = serde_json::from_str(json).ok()?;
    let branches: Vec<PlannedBranch> = output
        .branches
        .into_iter()
        .filter(|b| !b.model_id.trim().is_empty() && !b.prompt.trim().is_empty())
        .collect();

    if branches.is_empty() {
        return None;
    }
    Some(PlannerOutput { branches, ..output })
}

/// Deterministic fallback plan.
///
/// Picks up to three registry models from the usable providers, one per
/// provider first and then further models from the same providers. The first
/// branch asks the question verbatim; the rest rephrase it from a different
/// angle. Only the first wave asks to continue.
pub fn heuristic_plan(question: &str, usable_providers: &[ProviderId], depth: usize) -> PlannerOutput {
    let angles: [fn(&str) -> String; HEURISTIC_BRANCHES] = [
        |q| q.to_string(),
        |q| format!("What are the strongest counterarguments, risks or trade-offs regarding: {}", q),
        |q| format!("Give concrete, practical examples or evidence that bear on: {}", q),
    ];

    let mut providers: Vec<ProviderId> = Vec::new();
    for provider in usable_providers {
        if !providers.contains(provider) {
            providers.push(*provider);
        }
    }

    let per_provider: Vec<Vec<&'static str>> = providers
        .iter()
        .map(|p| registry::models_for(*p).map(|m| m.id).collect())
        .collect();
    let rounds = per_provider.iter().map(Vec::len).max().unwrap_or(0);

    // Round-robin: the n-th model of every provider before any (n+1)-th
    let picks = (0..rounds).flat_map(|round| {
        providers
            .iter()
            .zip(&per_provider)
            .filter_map(move |(provider, models)| models.get(round).map(|id| (*provider, *id)))
    });

    let branches = picks
        .take(HEURISTIC_BRANCHES)
        .zip(angles.iter())
        .map(|((provider, model_id), angle)| PlannedBranch {
            provider_id: provider.as_str().to_string(),
            model_id: model_id.to_string(),
            prompt: angle(question),
        })
        .collect();

    PlannerOutput {
        branches,
        merge_model: None,
        continue_: Some(depth < 1),
    }
}

/// Keep branches whose provider passes `is_usable`, capped at `max`
pub fn select_branches(
    branches: &[PlannedBranch],
    is_usable: impl Fn(ProviderId) -> bool,
    max: usize,
) -> Vec<(ModelRef, String)> {
    branches
        .iter()
        .map(|b| (b.model_ref(), b.prompt.clone()))
        .filter(|(model, _)| is_usable(model.provider))
        .take(max.min(MAX_BRANCHES))
        .collect()
}
