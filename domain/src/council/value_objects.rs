//! Council value objects - immutable result types for each stage.
//!
//! - [`Stage1Response`] / [`Stage1Result`] - divergence (independent answers)
//! - [`ResponseEvaluation`] / [`EvaluatorResult`] / [`Stage2Result`] - convergence (peer ranking)
//! - [`Stage3Result`] - synthesis (chairman's final answer)
//! - [`CouncilResult`] - complete record of one execution

use crate::core::model::ProviderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One member's raw answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Response {
    pub model_id: String,
    pub provider: ProviderId,
    /// Answer text (empty when the member failed)
    pub content: String,
    pub latency_ms: u64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Stage1Response {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Text embedded into evaluation and synthesis prompts.
    ///
    /// Failed members keep their slot, so they are shown with their error.
    pub fn evaluable_text(&self) -> String {
        match &self.error {
            Some(error) => format!("[no response: {}]", error),
            None => self.content.clone(),
        }
    }
}

/// Divergence stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Result {
    pub responses: Vec<Stage1Response>,
    /// Wall-clock span of the parallel batch
    pub total_latency_ms: u64,
    /// Sum of member costs
    pub total_cost: f64,
}

impl Stage1Result {
    pub fn new(responses: Vec<Stage1Response>, total_latency_ms: u64) -> Self {
        let total_cost = responses.iter().map(|r| r.cost).sum();
        Self {
            responses,
            total_latency_ms,
            total_cost,
        }
    }

    pub fn successful(&self) -> impl Iterator<Item = &Stage1Response> {
        self.responses.iter().filter(|r| r.is_success())
    }
}

/// One evaluator's judgment of one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvaluation {
    pub response_index: usize,
    /// 1 = best
    pub rank: usize,
    /// 0..=100
    pub score: u32,
    pub critique: String,
}

/// One evaluator's full ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResult {
    pub evaluator_model_id: String,
    /// One entry per response index, sorted by rank ascending
    pub rankings: Vec<ResponseEvaluation>,
    pub latency_ms: u64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluatorResult {
    /// Response indices in this evaluator's best→worst order
    pub fn ordering(&self) -> Vec<usize> {
        self.rankings.iter().map(|r| r.response_index).collect()
    }
}

/// Convergence stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Result {
    pub evaluations: Vec<EvaluatorResult>,
    /// Permutation of response indices, best first
    pub aggregated_ranking: Vec<usize>,
    /// Average score per response index
    pub scores: Vec<f64>,
    /// 0..=100 inter-evaluator positional agreement
    pub agreement_score: f64,
    pub total_latency_ms: u64,
    pub total_cost: f64,
}

/// Synthesis stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Result {
    pub final_response: String,
    /// 0..=100
    pub confidence: u32,
    pub reasoning: String,
    pub latency_ms: u64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Complete result of one council execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilResult {
    pub id: String,
    pub council_id: String,
    pub prompt: String,
    pub stage1: Stage1Result,
    pub stage2: Stage2Result,
    pub stage3: Stage3Result,
    pub total_latency_ms: u64,
    pub total_cost: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CouncilResult {
    /// Assemble the final record. Total cost is the sum of all three stages.
    pub fn new(
        council_id: impl Into<String>,
        prompt: impl Into<String>,
        stage1: Stage1Result,
        stage2: Stage2Result,
        stage3: Stage3Result,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let total_cost = stage1.total_cost + stage2.total_cost + stage3.cost;
        let total_latency_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            council_id: council_id.into(),
            prompt: prompt.into(),
            stage1,
            stage2,
            stage3,
            total_latency_ms,
            total_cost,
            started_at,
            finished_at,
        }
    }

    /// The top-ranked divergence response, if any
    pub fn winner(&self) -> Option<&Stage1Response> {
        self.stage2
            .aggregated_ranking
            .first()
            .and_then(|&i| self.stage1.responses.get(i))
    }
}
