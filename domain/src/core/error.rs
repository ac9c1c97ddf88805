//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Council has no members")]
    NoMembers,

    #[error("Council has no evaluators")]
    NoEvaluators,

    #[error("Invalid council definition: {0}")]
    InvalidCouncil(String),

    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("Unknown plan entry: {0}")]
    UnknownPlanEntry(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Wave limit reached: max depth is {0}")]
    WaveLimitExceeded(usize),
}
