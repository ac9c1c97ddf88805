//! Council definitions from TOML (`[councils.<id>]` sections)

use council_domain::orchestration::parse_qualified_model;
use council_domain::{
    ConfigIssue, ConfigIssueCode, CouncilDefinition, CouncilMember, EvaluationStrategy, SynthesisStrategy,
};
use serde::{Deserialize, Serialize};

/// A member entry: either a bare model id or a table with a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileMemberConfig {
    Model(String),
    Detailed {
        model: String,
        #[serde(default)]
        role: Option<String>,
    },
}

impl FileMemberConfig {
    fn model(&self) -> &str {
        match self {
            FileMemberConfig::Model(model) => model,
            FileMemberConfig::Detailed { model, .. } => model,
        }
    }

    fn to_member(&self) -> CouncilMember {
        let member = CouncilMember::new(parse_qualified_model(self.model().trim()));
        match self {
            FileMemberConfig::Detailed { role: Some(role), .. } => member.with_role(role.clone()),
            _ => member,
        }
    }
}

/// `evaluators = "same-as-members"` or `evaluators = ["gpt-4o", ...]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEvaluatorsConfig {
    Keyword(String),
    Models(Vec<String>),
}

/// Raw council definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub name: Option<String>,
    pub members: Vec<FileMemberConfig>,
    pub evaluators: Option<FileEvaluatorsConfig>,
    pub evaluation_strategy: Option<String>,
    /// Chairman model (default: the first member)
    pub chairman: Option<String>,
    pub synthesis_strategy: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub anonymize_responses: bool,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        Self {
            name: None,
            members: Vec::new(),
            evaluators: None,
            evaluation_strategy: None,
            chairman: None,
            synthesis_strategy: None,
            temperature: None,
            max_tokens: None,
            anonymize_responses: true,
        }
    }
}

impl FileCouncilConfig {
    /// Build the domain definition. Unknown strategies fall back to the
    /// default with a warning; a council without members is not built.
    pub fn to_definition(&self, id: &str) -> (Option<CouncilDefinition>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let members: Vec<CouncilMember> = self
            .members
            .iter()
            .filter(|m| !m.model().trim().is_empty())
            .map(FileMemberConfig::to_member)
            .collect();
        if members.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::EmptyCouncil,
                format!("councils.{}: no members configured, council ignored", id),
            ));
            return (None, issues);
        }

        let chairman = match self.chairman.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_qualified_model(raw),
            _ => members[0].model.clone(),
        };
        let name = self.name.clone().unwrap_or_else(|| id.to_string());
        let mut council = CouncilDefinition::new(id, name, members, chairman);

        match &self.evaluators {
            None => {}
            Some(FileEvaluatorsConfig::Keyword(keyword)) if keyword == "same-as-members" => {}
            Some(FileEvaluatorsConfig::Keyword(other)) => issues.push(ConfigIssue::warning(
                ConfigIssueCode::UnknownStrategy,
                format!(
                    "councils.{}.evaluators: unknown value '{}', using the members",
                    id, other
                ),
            )),
            Some(FileEvaluatorsConfig::Models(models)) => {
                let evaluators: Vec<_> = models
                    .iter()
                    .map(|m| m.trim())
                    .filter(|m| !m.is_empty())
                    .map(parse_qualified_model)
                    .collect();
                if !evaluators.is_empty() {
                    council = council.with_evaluators(evaluators);
                }
            }
        }

        if let Some(raw) = &self.evaluation_strategy {
            match raw.parse::<EvaluationStrategy>() {
                Ok(strategy) => council = council.with_evaluation_strategy(strategy),
                Err(e) => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownStrategy,
                    format!("councils.{}.evaluation_strategy: {}", id, e),
                )),
            }
        }
        if let Some(raw) = &self.synthesis_strategy {
            match raw.parse::<SynthesisStrategy>() {
                Ok(strategy) => council = council.with_synthesis_strategy(strategy),
                Err(e) => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownStrategy,
                    format!("councils.{}.synthesis_strategy: {}", id, e),
                )),
            }
        }

        if let Some(temperature) = self.temperature {
            council = council.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            council = council.with_max_tokens(max_tokens);
        }
        if !self.anonymize_responses {
            council = council.without_anonymization();
        }

        (Some(council), issues)
    }
}
