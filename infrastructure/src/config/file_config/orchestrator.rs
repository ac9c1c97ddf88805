//! Autonomous orchestrator configuration from TOML (`[orchestrator]` section)

use council_application::OrchestratorParams;
use council_domain::orchestration::{MAX_BRANCHES, MAX_DEPTH, MIN_DEPTH, parse_qualified_model};
use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Model that plans each wave (default: gpt-4o-mini)
    pub planner_model: Option<String>,
    /// Waves per run when `--depth` is not given
    pub max_depth: usize,
    pub max_branches: usize,
    pub branch_radius: f64,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let params = OrchestratorParams::default();
        Self {
            planner_model: None,
            max_depth: params.default_depth,
            max_branches: params.max_branches,
            branch_radius: params.branch_radius,
        }
    }
}

impl FileOrchestratorConfig {
    /// Out-of-range values are clamped with a warning
    pub fn to_params(&self) -> (OrchestratorParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut params = OrchestratorParams::default()
            .with_default_depth(self.max_depth)
            .with_max_branches(self.max_branches);

        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.max_depth) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::DepthOutOfRange,
                format!(
                    "orchestrator.max_depth: {} is outside {}..={}, using {}",
                    self.max_depth, MIN_DEPTH, MAX_DEPTH, params.default_depth
                ),
            ));
        }
        if self.max_branches == 0 || self.max_branches > MAX_BRANCHES {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::TooManyBranches,
                format!(
                    "orchestrator.max_branches: {} is outside 1..={}, using {}",
                    self.max_branches, MAX_BRANCHES, params.max_branches
                ),
            ));
        }

        if let Some(raw) = self.planner_model.as_deref().map(str::trim)
            && !raw.is_empty()
        {
            params = params.with_planner_model(parse_qualified_model(raw));
        }
        if self.branch_radius.is_finite() && self.branch_radius > 0.0 {
            params = params.with_branch_radius(self.branch_radius);
        }

        (params, issues)
    }
}
