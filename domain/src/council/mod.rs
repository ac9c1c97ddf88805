//! Council domain
//!
//! A council answers one prompt in three fixed stages:
//!
//! 1. **Divergence**: every member answers independently
//! 2. **Convergence**: evaluators rank the (anonymized) answers, and the
//!    rankings are aggregated into one ordering plus an agreement score
//! 3. **Synthesis**: the chairman writes the final answer from the ranked set
//!
//! Everything here is pure; the use case that drives the stages lives in
//! the application layer.

pub mod aggregation;
pub mod entities;
pub mod parsing;
pub mod stage;
pub mod value_objects;

pub use aggregation::{Aggregation, aggregate};
pub use entities::{
    Chairman, CouncilDefinition, CouncilMember, EvaluationStrategy, EvaluatorSet, SynthesisStrategy,
};
pub use parsing::{derive_confidence, extract_confidence, parse_evaluation, response_label};
pub use stage::{CouncilProgress, CouncilStage};
pub use value_objects::{
    CouncilResult, EvaluatorResult, ResponseEvaluation, Stage1Response, Stage1Result, Stage2Result,
    Stage3Result,
};
