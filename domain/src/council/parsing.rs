//! Evaluator output parsing for the convergence stage.
//!
//! These functions turn free-form evaluator text into structured rankings.
//! They are pure domain logic: no I/O, just text pattern matching, and they
//! never fail. Anything the evaluator did not state explicitly is filled in
//! with a deterministic default.
//!
//! # Expected evaluator format
//!
//! ```text
//! RANKING:
//! 1. Response B - most complete
//! 2. Response A - accurate but terse
//! 3. Response C
//!
//! SCORES:
//! A: 72
//! B: 91
//! C: 40
//! ```
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`response_label`] / [`label_index`] | `0 ↔ "A"`, `26 ↔ "AA"` |
//! | [`parse_evaluation`] | Evaluator text → one [`ResponseEvaluation`] per response |
//! | [`extract_confidence`] / [`derive_confidence`] | Chairman confidence |

use super::value_objects::ResponseEvaluation;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Critique attached to responses the evaluator never ranked
pub const NO_RANKING_CRITIQUE: &str = "No explicit ranking provided";

/// Score given to responses the evaluator never ranked
pub const UNRANKED_SCORE: u32 = 50;

static RANKING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)RANKING\s*:(.*?)(?:SCORES\s*:|\z)").unwrap());

static SCORES_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)SCORES\s*:(.*?)(?:RANKING\s*:|\z)").unwrap());

/// `... Response B ...` anywhere on the line
static RESPONSE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bResponse\s+([A-Z]{1,3})\b").unwrap());

/// Bare uppercase label at line start. Either numbered or bulleted
/// (`1. B`, `#2) C`, `- A`), or followed by a separator or the line end
/// (`B: clear`, `C`), so prose such as `I would put...` is not a label.
static BARE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:[-*]|#?\d+\s*[.):\-]?)\s*\**([A-Z]{1,3})\b|\**([A-Z]{1,3})\**\s*(?:[-:.)=\x{2013}\x{2014}]|$))",
    )
    .unwrap()
});

/// `A: 85`, `Response B = 70`, `- C: 40`
static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*]\s*)?\**(?:Response\s+)?([A-Z]{1,3})\**\s*[:=]\s*(\d{1,3})").unwrap()
});

static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence(?:\s+(?:level|score))?\s*[:=]?\s*(\d{1,3})\s*%?").unwrap()
});

/// Anonymous label for a response index.
///
/// Bijective base-26, so labels never run out: `A..Z`, then `AA, AB, …`.
///
/// ```
/// use council_domain::council::parsing::response_label;
///
/// assert_eq!(response_label(0), "A");
/// assert_eq!(response_label(25), "Z");
/// assert_eq!(response_label(26), "AA");
/// assert_eq!(response_label(27), "AB");
/// ```
pub fn response_label(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`response_label`]. Case-insensitive; `None` for non-letters.
pub fn label_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut value: usize = 0;
    for c in label.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        value = value
            .checked_mul(26)?
            .checked_add((c as u8 - b'A') as usize + 1)?;
    }
    Some(value - 1)
}

/// Parse one evaluator's raw text into rankings.
///
/// The result always holds exactly `num_responses` entries with unique
/// response indices, sorted by rank ascending:
///
/// - Each `RANKING:` line naming an in-range, not-yet-ranked label becomes an
///   entry whose rank is its position among accepted lines. Its default score
///   is `100 - position * 100 / num_responses`.
/// - A `SCORES:` line `<Label>: <n>` overrides the score of a ranked entry
///   (clamped to 100; the last line for a label wins).
/// - Every index left unranked is appended with score 50 and
///   [`NO_RANKING_CRITIQUE`].
pub fn parse_evaluation(text: &str, num_responses: usize) -> Vec<ResponseEvaluation> {
    let mut rankings: Vec<ResponseEvaluation> = Vec::with_capacity(num_responses);

    if let Some(block) = RANKING_BLOCK.captures(text).and_then(|c| c.get(1)) {
        for line in block.as_str().lines() {
            let Some((index, critique)) = parse_ranking_line(line, num_responses) else {
                continue;
            };
            if rankings.iter().any(|r| r.response_index == index) {
                continue;
            }
            let position = rankings.len();
            rankings.push(ResponseEvaluation {
                response_index: index,
                rank: position + 1,
                score: default_score(position, num_responses),
                critique,
            });
        }
    }

    let explicit_scores = parse_scores(text, num_responses);
    for entry in &mut rankings {
        if let Some(&score) = explicit_scores.get(&entry.response_index) {
            entry.score = score;
        }
    }

    for index in 0..num_responses {
        if !rankings.iter().any(|r| r.response_index == index) {
            let rank = rankings.len() + 1;
            rankings.push(ResponseEvaluation {
                response_index: index,
                rank,
                score: UNRANKED_SCORE,
                critique: NO_RANKING_CRITIQUE.to_string(),
            });
        }
    }

    rankings.sort_by_key(|r| r.rank);
    rankings
}

fn default_score(position: usize, num_responses: usize) -> u32 {
    let step = 100.0 / num_responses.max(1) as f64;
    (100.0 - position as f64 * step).round().clamp(0.0, 100.0) as u32
}

/// Extract `(response_index, critique)` from one ranking line
fn parse_ranking_line(line: &str, num_responses: usize) -> Option<(usize, String)> {
    if line.trim().is_empty() {
        return None;
    }

    let captures = RESPONSE_LABEL
        .captures(line)
        .or_else(|| BARE_LABEL.captures(line))?;
    let label = captures.get(1).or_else(|| captures.get(2))?;

    let index = label_index(label.as_str())?;
    if index >= num_responses {
        return None;
    }

    let critique = line[label.end()..]
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '*' | '–' | '—' | ')'))
        .to_string();

    Some((index, critique))
}

/// Explicit scores from the `SCORES:` block, keyed by response index
fn parse_scores(text: &str, num_responses: usize) -> HashMap<usize, u32> {
    let mut scores = HashMap::new();

    let Some(block) = SCORES_BLOCK.captures(text).and_then(|c| c.get(1)) else {
        return scores;
    };

    for line in block.as_str().lines() {
        let Some(caps) = SCORE_LINE.captures(line) else {
            continue;
        };
        let (Some(label), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(index) = label_index(label.as_str()) else {
            continue;
        };
        if index >= num_responses {
            continue;
        }
        if let Ok(score) = value.as_str().parse::<u32>() {
            scores.insert(index, score.min(100));
        }
    }

    scores
}

/// Explicit `confidence: NN` mention in chairman output, clamped to 0..=100
pub fn extract_confidence(text: &str) -> Option<u32> {
    CONFIDENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|v| v.min(100))
}

/// Confidence derived from evaluator agreement: `round(agreement * 0.9 + 10)`
pub fn derive_confidence(agreement_score: f64) -> u32 {
    (agreement_score.clamp(0.0, 100.0) * 0.9 + 10.0).round() as u32
}
