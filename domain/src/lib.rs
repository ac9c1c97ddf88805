//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A council answers one prompt in three stages: members answer
//! independently (divergence), evaluators rank the anonymized answers
//! (convergence), and a chairman writes the final answer (synthesis).
//! Ranking aggregation and agreement scoring are pure functions in
//! [`council::aggregation`].
//!
//! ## Waves
//!
//! The autonomous orchestrator explores a question in waves of parallel
//! branches, each closed by a merge. [`WavePlan`] records the run and
//! enforces monotonic status transitions.

pub mod config;
pub mod core;
pub mod council;
pub mod graph;
pub mod orchestration;
pub mod prompt;
pub mod providers;

// Re-export commonly used types
pub use config::OutputFormat;
pub use core::{
    error::DomainError,
    model::{ModelRef, ProviderId},
    registry::{Capability, ModelInfo},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use council::{
    Aggregation, Chairman, CouncilDefinition, CouncilMember, CouncilProgress, CouncilResult,
    CouncilStage, EvaluationStrategy, EvaluatorResult, EvaluatorSet, ResponseEvaluation,
    Stage1Response, Stage1Result, Stage2Result, Stage3Result, SynthesisStrategy,
};
pub use graph::{Connection, Graph, GraphNode, NodeKind, Position};
pub use orchestration::{
    CouncilBranch, CouncilMerge, PlannedBranch, PlannerOutput, RunStatus, WavePlan,
};
pub use prompt::{PlannerPromptTemplate, PromptTemplate};
pub use providers::ProviderCredential;
