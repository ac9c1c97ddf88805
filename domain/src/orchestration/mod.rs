//! Wave orchestration domain
//!
//! A run is a sequence of waves. Each wave fans out into branches and is
//! closed by one merge; [`plan::WavePlan`] records them and enforces the
//! status discipline.

pub mod plan;
pub mod planner_output;
pub mod status;

pub use plan::{CouncilBranch, CouncilMerge, MAX_DEPTH, MIN_DEPTH, WavePlan, clamp_depth};
pub use planner_output::{
    MAX_BRANCHES, PlannedBranch, PlannerOutput, extract_first_json_object, heuristic_plan,
    parse_planner_output, parse_qualified_model, select_branches,
};
pub use status::RunStatus;
