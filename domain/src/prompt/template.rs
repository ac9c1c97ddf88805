//! Prompt templates for the council stages

use crate::council::entities::{EvaluationStrategy, SynthesisStrategy};
use crate::council::parsing::response_label;
use crate::council::value_objects::{Stage1Result, Stage2Result};

/// Templates for generating prompts at each council stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for a divergence member, if it has a role
    pub fn member_system(role: Option<&str>) -> Option<String> {
        let role = role?.trim();
        if role.is_empty() {
            return None;
        }

        let stance = match role.to_ascii_lowercase().as_str() {
            "pro" => "Argue in favor of the proposition. Build the strongest honest case for it.",
            "contra" | "con" => {
                "Argue against the proposition. Build the strongest honest case against it."
            }
            "neutral" => "Stay neutral. Weigh both sides and state where the evidence points.",
            _ => "Answer from the perspective described by your role.",
        };

        Some(format!(
            "You are a council member with the role \"{}\".\n{}\nBe concise and support your points with reasoning.",
            role, stance
        ))
    }

    /// System prompt for convergence evaluators
    pub fn evaluation_system() -> &'static str {
        r#"You are an impartial evaluator comparing answers written by other experts.
Judge each answer on accuracy, completeness, clarity and usefulness.
You must follow the required output format exactly."#
    }

    /// User prompt sent identically to every evaluator.
    ///
    /// Responses are labeled `Response A`, `Response B`, ... in Stage-1
    /// order. When `anonymize` is false the model id follows the label.
    pub fn evaluation_prompt(
        question: &str,
        stage1: &Stage1Result,
        anonymize: bool,
        strategy: EvaluationStrategy,
    ) -> String {
        let mut prompt = format!("Original question: {}\n\nResponses to evaluate:\n", question);

        for (i, response) in stage1.responses.iter().enumerate() {
            let label = response_label(i);
            if anonymize {
                prompt.push_str(&format!("\n--- Response {} ---\n", label));
            } else {
                prompt.push_str(&format!("\n--- Response {} ({}) ---\n", label, response.model_id));
            }
            prompt.push_str(&response.evaluable_text());
            prompt.push('\n');
        }

        prompt.push('\n');
        prompt.push_str(Self::evaluation_instructions(strategy));

        let example_label = response_label(0);
        prompt.push_str(&format!(
            r#"

Finish with exactly these two sections:

RANKING:
1. Response {first} - one sentence on why
2. Response <label> - one sentence on why
(one line per response, best first)

SCORES:
{first}: <integer 0-100>
<label>: <integer 0-100>
(one line per response)"#,
            first = example_label
        ));

        prompt
    }

    fn evaluation_instructions(strategy: EvaluationStrategy) -> &'static str {
        match strategy {
            EvaluationStrategy::RankedChoice => {
                "Rank the responses from best to worst and give each a score."
            }
            EvaluationStrategy::Rubric => {
                "Score every response against this rubric before ranking: accuracy (40%), completeness (30%), clarity (20%), practical usefulness (10%)."
            }
            EvaluationStrategy::Critique => {
                "Write a short critique of each response naming its strongest and weakest point, then rank them."
            }
        }
    }

    /// System prompt for the chairman
    pub fn synthesis_system() -> &'static str {
        r#"You are the chairman of an expert council.
Your job is to produce the single best final answer from the council's ranked responses.
Be balanced and objective. Give weight to well-reasoned arguments regardless of source."#
    }

    /// Chairman prompt: responses best first, each with its averaged score
    /// and originating model.
    pub fn synthesis_prompt(
        question: &str,
        stage1: &Stage1Result,
        stage2: &Stage2Result,
        strategy: SynthesisStrategy,
    ) -> String {
        let mut prompt = format!(
            "Original question: {}\n\nCouncil responses, ranked best first (evaluator agreement: {:.0}%):\n",
            question, stage2.agreement_score
        );

        for (position, &index) in stage2.aggregated_ranking.iter().enumerate() {
            let Some(response) = stage1.responses.get(index) else {
                continue;
            };
            let score = stage2.scores.get(index).copied().unwrap_or_default();
            prompt.push_str(&format!(
                "\n--- #{} {} (score {:.1}) ---\n{}\n",
                position + 1,
                response.model_id,
                score,
                response.evaluable_text()
            ));
        }

        prompt.push('\n');
        prompt.push_str(Self::synthesis_instructions(strategy));
        prompt.push_str("\n\nEnd with a line of the form \"Confidence: NN\" (0-100).");

        prompt
    }

    fn synthesis_instructions(strategy: SynthesisStrategy) -> &'static str {
        match strategy {
            SynthesisStrategy::MergeBest => {
                r#"Write a final answer that starts from the top-ranked response and merges in any correct, non-redundant points from the others.
Drop claims that lower-ranked responses make without support."#
            }
            SynthesisStrategy::DebateResolve => {
                r#"The responses argue different positions.
Identify each point of disagreement, decide which side is better supported and why, and conclude with a resolved position."#
            }
            SynthesisStrategy::WeightedAverage => {
                r#"Combine all responses, giving each influence proportional to its score.
Where responses conflict, prefer the higher-scored position but mention credible alternatives."#
            }
        }
    }

    /// Fixed reasoning sentence stored on the synthesis result
    pub fn synthesis_reasoning(response_count: usize, agreement_score: f64) -> String {
        format!(
            "Synthesized from {} responses with {:.0}% evaluator agreement.",
            response_count, agreement_score
        )
    }
}
