//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod autonomous_council;
pub mod council_plan;
pub mod execute_node;
pub mod orchestration_error;
pub mod run_council;
pub mod run_registry;
pub(crate) mod shared;
