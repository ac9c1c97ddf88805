//! Application-level configuration.
//!
//! - [`OrchestratorParams`]: wave planner control (planner model, branch cap, layout)

pub mod orchestrator_params;

pub use orchestrator_params::OrchestratorParams;
