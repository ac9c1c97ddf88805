//! Orchestrator parameters: wave planner control.
//!
//! [`OrchestratorParams`] groups the static parameters of the autonomous
//! wave orchestrator. These are application-layer concerns, not domain
//! policy.

use council_domain::graph::DEFAULT_BRANCH_RADIUS;
use council_domain::orchestration::{MAX_BRANCHES, MAX_DEPTH, MIN_DEPTH};
use council_domain::ModelRef;
use serde::{Deserialize, Serialize};

/// Default model asked to plan each wave
pub const DEFAULT_PLANNER_MODEL: &str = "gpt-4o-mini";

/// Wave planner control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorParams {
    /// Model that proposes the branches of each wave
    pub planner_model: ModelRef,
    /// Depth used when a run does not request one
    pub default_depth: usize,
    /// Branch cap per wave (never above 5)
    pub max_branches: usize,
    /// Distance of branch nodes from their parent
    pub branch_radius: f64,
    /// Number of available models listed in the planner prompt
    pub model_sample_size: usize,
}

impl Default for OrchestratorParams {
    fn default() -> Self {
        Self {
            planner_model: ModelRef::from_model_id(DEFAULT_PLANNER_MODEL),
            default_depth: 2,
            max_branches: MAX_BRANCHES,
            branch_radius: DEFAULT_BRANCH_RADIUS,
            model_sample_size: 12,
        }
    }
}

impl OrchestratorParams {
    // ==================== Builder Methods ====================

    pub fn with_planner_model(mut self, model: ModelRef) -> Self {
        self.planner_model = model;
        self
    }

    pub fn with_default_depth(mut self, depth: usize) -> Self {
        self.default_depth = depth.clamp(MIN_DEPTH, MAX_DEPTH);
        self
    }

    /// Clamped to `1..=5`
    pub fn with_max_branches(mut self, max: usize) -> Self {
        self.max_branches = max.clamp(1, MAX_BRANCHES);
        self
    }

    pub fn with_branch_radius(mut self, radius: f64) -> Self {
        self.branch_radius = radius;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::ProviderId;

    #[test]
    fn test_defaults() {
        let params = OrchestratorParams::default();
        assert_eq!(params.planner_model.provider, ProviderId::OpenAi);
        assert_eq!(params.max_branches, 5);
    }

    #[test]
    fn test_builders_clamp() {
        let params = OrchestratorParams::default()
            .with_max_branches(9)
            .with_default_depth(0);
        assert_eq!(params.max_branches, 5);
        assert_eq!(params.default_depth, 1);
    }
}
