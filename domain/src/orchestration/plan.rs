//! Wave plan: the branches and merges of one orchestration run
//!
//! All updates are replace-on-write: every `with_*` method returns a new
//! plan and leaves the receiver untouched, so concurrent completions can
//! each apply their own update without tearing.

use super::status::RunStatus;
use crate::core::error::DomainError;
use crate::core::model::ProviderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest accepted depth
pub const MIN_DEPTH: usize = 1;
/// Largest accepted depth
pub const MAX_DEPTH: usize = 6;

/// Clamp a requested depth to `MIN_DEPTH..=MAX_DEPTH`
pub fn clamp_depth(depth: usize) -> usize {
    depth.clamp(MIN_DEPTH, MAX_DEPTH)
}

/// One model's exploration inside a wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilBranch {
    pub id: String,
    pub wave: usize,
    pub model_id: String,
    pub provider_id: ProviderId,
    pub source_node_id: String,
    pub node_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl CouncilBranch {
    pub fn new(
        wave: usize,
        provider_id: ProviderId,
        model_id: impl Into<String>,
        source_node_id: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wave,
            model_id: model_id.into(),
            provider_id,
            source_node_id: source_node_id.into(),
            node_id: node_id.into(),
            status: RunStatus::Queued,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// The single merge that closes a wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilMerge {
    pub id: String,
    pub wave: usize,
    pub input_node_ids: Vec<String>,
    pub output_node_id: String,
    pub provider_id: ProviderId,
    pub model_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CouncilMerge {
    pub fn new(
        wave: usize,
        input_node_ids: Vec<String>,
        output_node_id: impl Into<String>,
        provider_id: ProviderId,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wave,
            input_node_ids,
            output_node_id: output_node_id.into(),
            provider_id,
            model_id: model_id.into(),
            status: RunStatus::Queued,
            error: None,
        }
    }
}

/// State of one orchestration run
///
/// # Example
///
/// ```
/// use council_domain::{CouncilBranch, ProviderId, RunStatus, WavePlan};
///
/// let plan = WavePlan::new(10);
/// assert_eq!(plan.max_depth, 6);
///
/// let branch = CouncilBranch::new(0, ProviderId::OpenAi, "gpt-4o", "root", "n1");
/// let id = branch.id.clone();
/// let plan = plan.with_wave(vec![branch]).unwrap();
/// let plan = plan.with_branch_status(&id, RunStatus::Running, None).unwrap();
/// let plan = plan.with_branch_status(&id, RunStatus::Done, None).unwrap();
///
/// assert!(plan.with_branch_status(&id, RunStatus::Running, None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WavePlan {
    pub max_depth: usize,
    pub wave_count: usize,
    pub branches: Vec<CouncilBranch>,
    pub merges: Vec<CouncilMerge>,
}

impl WavePlan {
    /// Empty plan; `max_depth` is clamped to `1..=6`
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: clamp_depth(max_depth),
            ..Default::default()
        }
    }

    /// Whether another wave fits under `max_depth`
    pub fn can_start_wave(&self) -> bool {
        self.wave_count < self.max_depth
    }

    /// Append a new wave of branches
    pub fn with_wave(&self, branches: Vec<CouncilBranch>) -> Result<WavePlan, DomainError> {
        if !self.can_start_wave() {
            return Err(DomainError::WaveLimitExceeded(self.max_depth));
        }
        let mut next = self.clone();
        next.branches.extend(branches);
        next.wave_count += 1;
        Ok(next)
    }

    /// Append the merge of the current wave
    pub fn with_merge(&self, merge: CouncilMerge) -> WavePlan {
        let mut next = self.clone();
        next.merges.push(merge);
        next
    }

    pub fn branch(&self, id: &str) -> Option<&CouncilBranch> {
        self.branches.iter().find(|b| b.id == id)
    }

    pub fn merge(&self, id: &str) -> Option<&CouncilMerge> {
        self.merges.iter().find(|m| m.id == id)
    }

    pub fn branches_in_wave(&self, wave: usize) -> impl Iterator<Item = &CouncilBranch> {
        self.branches.iter().filter(move |b| b.wave == wave)
    }

    /// Move a branch to `status`, rejecting any non-monotonic transition
    pub fn with_branch_status(
        &self,
        id: &str,
        status: RunStatus,
        error: Option<String>,
    ) -> Result<WavePlan, DomainError> {
        let position = self
            .branches
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| DomainError::UnknownPlanEntry(id.to_string()))?;

        let current = &self.branches[position];
        check_transition(id, current.status, status)?;

        let now = Utc::now();
        let mut updated = current.clone();
        updated.status = status;
        if status == RunStatus::Running {
            updated.started_at = Some(now);
        }
        if status.is_terminal() {
            updated.finished_at = Some(now);
            updated.error = error;
        }

        let mut next = self.clone();
        next.branches[position] = updated;
        Ok(next)
    }

    /// Move a merge to `status`, rejecting any non-monotonic transition
    pub fn with_merge_status(
        &self,
        id: &str,
        status: RunStatus,
        error: Option<String>,
    ) -> Result<WavePlan, DomainError> {
        let position = self
            .merges
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| DomainError::UnknownPlanEntry(id.to_string()))?;

        let current = &self.merges[position];
        check_transition(id, current.status, status)?;

        let mut updated = current.clone();
        updated.status = status;
        if status.is_terminal() {
            updated.error = error;
        }

        let mut next = self.clone();
        next.merges[position] = updated;
        Ok(next)
    }

    /// True when every branch and merge has reached a terminal status
    pub fn is_settled(&self) -> bool {
        self.branches.iter().all(|b| b.status.is_terminal())
            && self.merges.iter().all(|m| m.status.is_terminal())
    }

    /// Number of entries (branches + merges) that ended in error
    pub fn error_count(&self) -> usize {
        self.branches.iter().filter(|b| b.status == RunStatus::Error).count()
            + self.merges.iter().filter(|m| m.status == RunStatus::Error).count()
    }
}

fn check_transition(id: &str, from: RunStatus, to: RunStatus) -> Result<(), DomainError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
