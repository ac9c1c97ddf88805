//! Run status of a plan entry (branch or merge)

use serde::{Deserialize, Serialize};

/// Status of one branch or merge.
///
/// Advances strictly `Queued → Running → {Done | Error}`. Steps may be
/// skipped (a branch can fail before it starts) but never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Queued,
    Running,
    Done,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Error)
    }

    fn order(&self) -> u8 {
        match self {
            RunStatus::Queued => 0,
            RunStatus::Running => 1,
            RunStatus::Done | RunStatus::Error => 2,
        }
    }

    /// Whether moving from `self` to `next` keeps the status monotonic
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        next.order() > self.order()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Done));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Error));
        assert!(RunStatus::Queued.can_transition_to(RunStatus::Error));
    }

    #[test]
    fn test_no_regression_or_resurrection() {
        assert!(!RunStatus::Done.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Error.can_transition_to(RunStatus::Done));
        assert!(!RunStatus::Done.can_transition_to(RunStatus::Error));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Queued));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Running));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&RunStatus::Done).unwrap(), "\"done\"");
    }
}
