//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain types on demand.

mod councils;
mod logging;
mod orchestrator;
mod output;
mod providers;

pub use councils::{FileCouncilConfig, FileEvaluatorsConfig, FileMemberConfig};
pub use logging::FileLoggingConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use output::FileOutputConfig;
pub use providers::{FileProviderConfig, FileProvidersConfig};

use council_domain::{ConfigIssue, ConfigIssueCode, CouncilDefinition, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Council used when neither `--council` nor `default_council` is set
pub const FALLBACK_COUNCIL: &str = "balanced";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("unknown council '{0}'")]
    UnknownCouncil(String),

    #[error("council '{id}' is invalid: {reason}")]
    InvalidCouncil { id: String, reason: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Per-provider credentials and endpoints
    pub providers: FileProvidersConfig,
    /// User-defined councils; these shadow presets with the same id
    pub councils: BTreeMap<String, FileCouncilConfig>,
    pub default_council: Option<String>,
    pub orchestrator: FileOrchestratorConfig,
    pub output: FileOutputConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for id in self.providers.keys() {
            if id.parse::<ProviderId>().is_err() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownProvider,
                    format!("providers.{}: unknown provider, section ignored", id),
                ));
            }
        }

        for (id, council) in &self.councils {
            issues.extend(council.to_definition(id).1);
        }

        if let Some(id) = &self.default_council
            && self.council(id).is_err()
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownDefaultCouncil,
                format!("default_council: '{}' is neither configured nor a preset", id),
            ));
        }

        issues.extend(self.orchestrator.to_params().1);
        issues
    }

    /// Id of the council to run when none is requested
    pub fn default_council_id(&self) -> &str {
        self.default_council.as_deref().unwrap_or(FALLBACK_COUNCIL)
    }

    /// Resolve a council by id: configured councils first, then presets
    pub fn council(&self, id: &str) -> Result<CouncilDefinition, ConfigValidationError> {
        let council = match self.councils.get(id) {
            Some(config) => config.to_definition(id).0.ok_or_else(|| ConfigValidationError::InvalidCouncil {
                id: id.to_string(),
                reason: "no members configured".to_string(),
            })?,
            None => CouncilDefinition::preset(id).ok_or_else(|| ConfigValidationError::UnknownCouncil(id.to_string()))?,
        };

        council.validate().map_err(|e| ConfigValidationError::InvalidCouncil {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(council)
    }

    /// Presets merged with configured councils, sorted by id
    pub fn councils(&self) -> Vec<CouncilDefinition> {
        let mut all: BTreeMap<String, CouncilDefinition> = CouncilDefinition::presets()
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        for (id, config) in &self.councils {
            if let Some(council) = config.to_definition(id).0 {
                all.insert(id.clone(), council);
            }
        }
        all.into_values().collect()
    }
}
