//! Prompt domain
//!
//! Templates for the council stages and for the autonomous wave planner.

mod planner;
mod template;

pub use planner::PlannerPromptTemplate;
pub use template::PromptTemplate;
