//! Council definition entities
//!
//! A [`CouncilDefinition`] is static configuration: who answers (members),
//! who judges (evaluators), and who writes the final answer (chairman).
//! It is immutable for the duration of an execution, so concurrent runs can
//! share one definition.

use crate::core::error::DomainError;
use crate::core::model::ModelRef;
use serde::{Deserialize, Serialize};

/// One divergence-stage participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilMember {
    pub model: ModelRef,
    /// Advisory stance ("pro", "contra", "neutral", ...) used only when
    /// building the member's prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl CouncilMember {
    pub fn new(model: ModelRef) -> Self {
        Self { model, role: None }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Who evaluates the divergence responses
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluatorSet {
    /// Every member also evaluates
    #[default]
    SameAsMembers,
    /// A separate evaluator panel
    Explicit(Vec<ModelRef>),
}

/// Instructions given to evaluators in the convergence stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationStrategy {
    /// Rank all responses, then score them
    #[default]
    RankedChoice,
    /// Score against an explicit rubric, then rank by score
    Rubric,
    /// Critique weaknesses first, then rank
    Critique,
}

impl EvaluationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStrategy::RankedChoice => "ranked-choice",
            EvaluationStrategy::Rubric => "rubric",
            EvaluationStrategy::Critique => "critique",
        }
    }
}

impl std::str::FromStr for EvaluationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ranked-choice" | "ranked" => Ok(EvaluationStrategy::RankedChoice),
            "rubric" => Ok(EvaluationStrategy::Rubric),
            "critique" => Ok(EvaluationStrategy::Critique),
            other => Err(format!(
                "Unknown evaluation strategy: {}. Valid: ranked-choice, rubric, critique",
                other
            )),
        }
    }
}

/// How the chairman combines the ranked responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisStrategy {
    #[default]
    MergeBest,
    DebateResolve,
    WeightedAverage,
}

impl SynthesisStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStrategy::MergeBest => "merge-best",
            SynthesisStrategy::DebateResolve => "debate-resolve",
            SynthesisStrategy::WeightedAverage => "weighted-average",
        }
    }
}

impl std::fmt::Display for SynthesisStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SynthesisStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge-best" => Ok(SynthesisStrategy::MergeBest),
            "debate-resolve" => Ok(SynthesisStrategy::DebateResolve),
            "weighted-average" => Ok(SynthesisStrategy::WeightedAverage),
            other => Err(format!(
                "Unknown synthesis strategy: {}. Valid: merge-best, debate-resolve, weighted-average",
                other
            )),
        }
    }
}

/// The synthesis-stage model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chairman {
    pub model: ModelRef,
    #[serde(default)]
    pub strategy: SynthesisStrategy,
}

/// Static council configuration (Entity)
///
/// # Example
///
/// ```
/// use council_domain::{CouncilDefinition, CouncilMember, ModelRef};
///
/// let council = CouncilDefinition::new(
///     "review",
///     "Code Review Council",
///     vec![
///         CouncilMember::new(ModelRef::from_model_id("gpt-4o")),
///         CouncilMember::new(ModelRef::from_model_id("claude-3-5-sonnet-20241022")),
///     ],
///     ModelRef::from_model_id("gpt-4o"),
/// );
/// assert!(council.anonymize_responses);
/// assert_eq!(council.evaluator_models().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilDefinition {
    pub id: String,
    pub name: String,
    pub members: Vec<CouncilMember>,
    #[serde(default)]
    pub evaluators: EvaluatorSet,
    #[serde(default)]
    pub evaluation_strategy: EvaluationStrategy,
    pub chairman: Chairman,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_anonymize")]
    pub anonymize_responses: bool,
}

fn default_anonymize() -> bool {
    true
}

impl CouncilDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        members: Vec<CouncilMember>,
        chairman: ModelRef,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members,
            evaluators: EvaluatorSet::SameAsMembers,
            evaluation_strategy: EvaluationStrategy::default(),
            chairman: Chairman {
                model: chairman,
                strategy: SynthesisStrategy::default(),
            },
            temperature: None,
            max_tokens: None,
            anonymize_responses: true,
        }
    }

    pub fn with_evaluators(mut self, evaluators: Vec<ModelRef>) -> Self {
        self.evaluators = EvaluatorSet::Explicit(evaluators);
        self
    }

    pub fn with_evaluation_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.evaluation_strategy = strategy;
        self
    }

    pub fn with_synthesis_strategy(mut self, strategy: SynthesisStrategy) -> Self {
        self.chairman.strategy = strategy;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn without_anonymization(mut self) -> Self {
        self.anonymize_responses = false;
        self
    }

    /// Models that run the convergence stage
    pub fn evaluator_models(&self) -> Vec<ModelRef> {
        match &self.evaluators {
            EvaluatorSet::SameAsMembers => self.members.iter().map(|m| m.model.clone()).collect(),
            EvaluatorSet::Explicit(models) => models.clone(),
        }
    }

    /// Validate the definition
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.members.is_empty() {
            return Err(DomainError::NoMembers);
        }
        if self.evaluator_models().is_empty() {
            return Err(DomainError::NoEvaluators);
        }
        if self.chairman.model.model_id.trim().is_empty() {
            return Err(DomainError::InvalidCouncil(
                "chairman model id is empty".to_string(),
            ));
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(DomainError::InvalidCouncil(format!(
                "temperature {} is outside 0.0..=2.0",
                t
            )));
        }
        Ok(())
    }

    /// Built-in councils, available without any configuration
    pub fn presets() -> Vec<CouncilDefinition> {
        let m = ModelRef::from_model_id;

        vec![
            CouncilDefinition::new(
                "balanced",
                "Balanced Council",
                vec![
                    CouncilMember::new(m("gpt-4o")),
                    CouncilMember::new(m("claude-3-5-sonnet-20241022")),
                    CouncilMember::new(m("gemini-1.5-pro")),
                ],
                m("claude-3-5-sonnet-20241022"),
            ),
            CouncilDefinition::new(
                "debate",
                "Debate Council",
                vec![
                    CouncilMember::new(m("gpt-4o")).with_role("pro"),
                    CouncilMember::new(m("claude-3-5-sonnet-20241022")).with_role("contra"),
                    CouncilMember::new(m("gemini-1.5-pro")).with_role("neutral"),
                ],
                m("gpt-4o"),
            )
            .with_evaluation_strategy(EvaluationStrategy::Critique)
            .with_synthesis_strategy(SynthesisStrategy::DebateResolve),
            CouncilDefinition::new(
                "quick",
                "Quick Council",
                vec![
                    CouncilMember::new(m("gpt-4o-mini")),
                    CouncilMember::new(m("claude-3-5-haiku-20241022")),
                ],
                m("gpt-4o-mini"),
            )
            .with_synthesis_strategy(SynthesisStrategy::WeightedAverage)
            .with_max_tokens(1024),
        ]
    }

    /// Look up a built-in council by id
    pub fn preset(id: &str) -> Option<CouncilDefinition> {
        Self::presets().into_iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ProviderId;

    fn sample() -> CouncilDefinition {
        CouncilDefinition::new(
            "t",
            "Test",
            vec![
                CouncilMember::new(ModelRef::new(ProviderId::OpenAi, "gpt-4o")),
                CouncilMember::new(ModelRef::new(ProviderId::Google, "gemini-1.5-pro")),
            ],
            ModelRef::new(ProviderId::OpenAi, "gpt-4o"),
        )
    }

    #[test]
    fn test_evaluators_default_to_members() {
        let council = sample();
        let evaluators = council.evaluator_models();
        assert_eq!(evaluators.len(), 2);
        assert_eq!(evaluators[1].model_id, "gemini-1.5-pro");
    }

    #[test]
    fn test_explicit_evaluators() {
        let council =
            sample().with_evaluators(vec![ModelRef::new(ProviderId::Anthropic, "claude-3-opus-20240229")]);
        let evaluators = council.evaluator_models();
        assert_eq!(evaluators.len(), 1);
        assert_eq!(evaluators[0].provider, ProviderId::Anthropic);
    }

    #[test]
    fn test_validate_rejects_empty_members() {
        let mut council = sample();
        council.members.clear();
        assert_eq!(council.validate(), Err(DomainError::NoMembers));
    }

    #[test]
    fn test_validate_rejects_empty_explicit_evaluators() {
        let council = sample().with_evaluators(vec![]);
        assert_eq!(council.validate(), Err(DomainError::NoEvaluators));
    }

    #[test]
    fn test_validate_temperature_range() {
        assert!(sample().with_temperature(0.7).validate().is_ok());
        assert!(sample().with_temperature(3.5).validate().is_err());
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in CouncilDefinition::presets() {
            assert!(preset.validate().is_ok(), "preset {} invalid", preset.id);
        }
        let debate = CouncilDefinition::preset("debate").unwrap();
        assert_eq!(debate.chairman.strategy, SynthesisStrategy::DebateResolve);
        assert!(debate.members.iter().all(|m| m.role.is_some()));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "debate-resolve".parse::<SynthesisStrategy>().ok(),
            Some(SynthesisStrategy::DebateResolve)
        );
        assert_eq!(
            "ranked".parse::<EvaluationStrategy>().ok(),
            Some(EvaluationStrategy::RankedChoice)
        );
        assert!("best-of".parse::<SynthesisStrategy>().is_err());
    }

    #[test]
    fn test_definition_deserializes_with_defaults() {
        let json = r#"{
            "id": "x",
            "name": "X",
            "members": [{"model": {"provider": "openai", "model_id": "gpt-4o"}}],
            "chairman": {"model": {"provider": "openai", "model_id": "gpt-4o"}}
        }"#;
        let council: CouncilDefinition = serde_json::from_str(json).unwrap();
        assert!(council.anonymize_responses);
        assert_eq!(council.evaluators, EvaluatorSet::SameAsMembers);
        assert_eq!(council.chairman.strategy, SynthesisStrategy::MergeBest);
    }
}
