//! Output format value object

use serde::{Deserialize, Serialize};

/// How a council result is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every stage: responses, rankings, synthesis
    Full,
    /// Only the final synthesis (default)
    Synthesis,
    /// The whole `CouncilResult` as JSON
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Synthesis
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "synthesis" => Ok(Self::Synthesis),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown output format: {}. Valid: full, synthesis, json", other)),
        }
    }
}
