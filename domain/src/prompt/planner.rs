//! Prompt templates for the autonomous wave planner and merge step

/// Templates used by the autonomous orchestrator
pub struct PlannerPromptTemplate;

impl PlannerPromptTemplate {
    /// System prompt asking the planner for a strict JSON wave plan
    pub fn planner_system(available_models: &[String], max_branches: usize) -> String {
        let sample = if available_models.is_empty() {
            "(none configured)".to_string()
        } else {
            available_models
                .iter()
                .map(|m| format!("- {}", m))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"You plan one wave of a multi-model exploration.
Rules:
- Propose 3-{max} branches.
- Use diverse providers: avoid giving two branches the same provider when others are available.
- Give each branch a short, targeted prompt exploring a different angle of the question.
- Only use models from the list below, written as provider/model.

Available models:
{sample}

Respond with a single JSON object and nothing else:
{{"branches":[{{"providerId":"<provider>","modelId":"<model>","prompt":"<prompt>"}}],"mergeModel":"<provider>/<model>","continue":true}}

Set "continue" to false when another wave would not add anything."#,
            max = max_branches.max(3),
            sample = sample
        )
    }

    /// User prompt for one planning round
    pub fn planner_prompt(question: &str, context: Option<&str>, wave: usize, max_depth: usize) -> String {
        let mut prompt = format!("Question: {}\n\nThis is wave {} of at most {}.", question, wave + 1, max_depth);
        if let Some(context) = context
            && !context.trim().is_empty()
        {
            prompt.push_str(&format!(
                "\n\nSummary of the previous wave:\n{}\n\nPlan branches that go deeper or fill gaps.",
                context
            ));
        }
        prompt
    }

    /// Merge prompt combining every branch output of one wave.
    ///
    /// Each entry is `(provider/model, response text)`.
    pub fn merge_prompt(question: &str, outputs: &[(String, String)]) -> String {
        let mut prompt = format!(
            "Question: {}\n\nSeveral models explored this question from different angles:\n",
            question
        );

        for (i, (source, text)) in outputs.iter().enumerate() {
            prompt.push_str(&format!("\n--- Branch {} ({}) ---\n{}\n", i + 1, source, text));
        }

        prompt.push_str(
            r#"
Merge these into one coherent answer.
Keep the points the branches agree on, resolve contradictions explicitly, and note open questions."#,
        );

        prompt
    }
}
