//! Errors shared by the wave orchestrators

use council_domain::DomainError;
use thiserror::Error;

/// Run-level failures of a wave orchestration.
///
/// Per-branch and per-merge failures never surface here; they are recorded
/// on the plan entry and the node instead.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Root node not found: {0}")]
    RootNotFound(String),

    #[error("No question to explore: the root node has no prompt")]
    NoQuestion,

    #[error("No viable branches: no planned model has a usable provider credential")]
    NoViableBranches,

    /// Distinguished abort signal. Not a user-facing error.
    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Plan(#[from] DomainError),
}

impl OrchestrationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestrationError::Cancelled)
    }
}
