//! Rank aggregation across evaluators.
//!
//! Deterministic and pure: the same evaluations always produce the same
//! ordering, scores and agreement.

use super::parsing::UNRANKED_SCORE;
use super::value_objects::EvaluatorResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Combined view of every evaluator's ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Permutation of `0..num_responses`, best first
    pub ranking: Vec<usize>,
    /// Average score per response index (`len == num_responses`)
    pub scores: Vec<f64>,
    /// 0..=100
    pub agreement_score: f64,
}

/// Aggregate evaluator rankings for `num_responses` responses.
///
/// # Example
///
/// ```
/// use council_domain::council::aggregation::aggregate;
/// use council_domain::council::parsing::parse_evaluation;
/// use council_domain::EvaluatorResult;
///
/// let text = "RANKING:\n1. Response B\n2. Response A\nSCORES:\nA: 40\nB: 90";
/// let evaluator = EvaluatorResult {
///     evaluator_model_id: "gpt-4o".into(),
///     rankings: parse_evaluation(text, 2),
///     latency_ms: 0,
///     cost: 0.0,
///     error: None,
/// };
///
/// let agg = aggregate(&[evaluator], 2);
/// assert_eq!(agg.ranking, vec![1, 0]);
/// assert_eq!(agg.scores, vec![40.0, 90.0]);
/// assert_eq!(agg.agreement_score, 100.0);
/// ```
pub fn aggregate(evaluations: &[EvaluatorResult], num_responses: usize) -> Aggregation {
    let scores = average_scores(evaluations, num_responses);
    let ranking = rank_by_score(&scores);
    let agreement_score = agreement_score(evaluations, num_responses);

    Aggregation {
        ranking,
        scores,
        agreement_score,
    }
}

/// Mean score per response index over every evaluator that ranked it.
///
/// Indices nobody scored default to 50.
pub fn average_scores(evaluations: &[EvaluatorResult], num_responses: usize) -> Vec<f64> {
    let mut sums = vec![0.0_f64; num_responses];
    let mut counts = vec![0_usize; num_responses];

    for evaluation in evaluations {
        for entry in &evaluation.rankings {
            if entry.response_index < num_responses {
                sums[entry.response_index] += entry.score as f64;
                counts[entry.response_index] += 1;
            }
        }
    }

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| {
            if count == 0 {
                UNRANKED_SCORE as f64
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Indices sorted by descending score; ties keep index order.
pub fn rank_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    order
}

/// Mean pairwise positional agreement between evaluators, scaled to 0..=100.
///
/// For each unordered pair, the fraction of rank positions at which both
/// evaluators placed the same response. Zero or one evaluator is full
/// agreement by definition.
pub fn agreement_score(evaluations: &[EvaluatorResult], num_responses: usize) -> f64 {
    if evaluations.len() <= 1 {
        return 100.0;
    }

    let orderings: Vec<Vec<usize>> = evaluations.iter().map(EvaluatorResult::ordering).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;

    for i in 0..orderings.len() {
        for j in (i + 1)..orderings.len() {
            total += pair_agreement(&orderings[i], &orderings[j], num_responses);
            pairs += 1;
        }
    }

    (total / pairs as f64).clamp(0.0, 100.0)
}

fn pair_agreement(a: &[usize], b: &[usize], positions: usize) -> f64 {
    if positions == 0 {
        return 100.0;
    }
    let matches = (0..positions)
        .filter(|&k| matches!((a.get(k), b.get(k)), (Some(x), Some(y)) if x == y))
        .count();
    matches as f64 / positions as f64 * 100.0
}
