//! Council stages and progress events

use serde::{Deserialize, Serialize};

/// Stage of a council execution. Stages run strictly in order, once each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouncilStage {
    /// Every member answers independently
    Divergence,
    /// Evaluators rank the anonymized answers
    Convergence,
    /// The chairman writes the final answer
    Synthesis,
}

impl CouncilStage {
    /// 1-based stage number
    pub fn number(&self) -> u8 {
        match self {
            CouncilStage::Divergence => 1,
            CouncilStage::Convergence => 2,
            CouncilStage::Synthesis => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CouncilStage::Divergence => "Divergence",
            CouncilStage::Convergence => "Convergence",
            CouncilStage::Synthesis => "Synthesis",
        }
    }
}

impl std::fmt::Display for CouncilStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage {}: {}", self.number(), self.display_name())
    }
}

/// Progress event emitted while a council runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilProgress {
    pub stage: CouncilStage,
    pub stage_name: String,
    /// Cumulative percentage within the stage, 0..=100
    pub progress: u8,
    pub message: String,
}

impl CouncilProgress {
    /// Progress after `completed` of `total` tasks: `round(completed / total * 100)`
    pub fn new(stage: CouncilStage, completed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            stage_name: stage.display_name().to_string(),
            progress: percent(completed, total),
            message: message.into(),
        }
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
