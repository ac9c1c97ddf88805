//! Console output formatter for council results and wave plans

use colored::Colorize;
use council_domain::core::registry;
use council_domain::core::string::{clip, first_line};
use council_domain::council::response_label;
use council_domain::{CouncilResult, Graph, ModelRef, OutputFormat, RunStatus, WavePlan};

/// Branch preview length in plan summaries
const PREVIEW_CHARS: usize = 100;

/// Formats council results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render `result` in the requested format
    pub fn render(result: &CouncilResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format(result),
            OutputFormat::Synthesis => Self::format_synthesis_only(result),
            OutputFormat::Json => Self::format_json(result),
        }
    }

    /// Format the complete council result
    pub fn format(result: &CouncilResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("LLM Council Results"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Council:".cyan().bold(), result.council_id));
        output.push_str(&format!("{} {}\n", "Question:".cyan().bold(), result.prompt));

        // Stage 1
        output.push_str(&Self::section_header("Stage 1: Divergence"));
        for (i, response) in result.stage1.responses.iter().enumerate() {
            let title = format!("── {} · {} ({}ms) ──", response_label(i), response.model_id, response.latency_ms);
            match &response.error {
                None => output.push_str(&format!("\n{}\n{}\n", title.yellow().bold(), response.content)),
                Some(error) => output.push_str(&format!("\n{}\nError: {}\n", title.red().bold(), error)),
            }
        }

        // Stage 2
        output.push_str(&Self::section_header("Stage 2: Convergence"));
        output.push_str(&format!(
            "\n{} {:.0}/100\n",
            "Agreement:".cyan().bold(),
            result.stage2.agreement_score
        ));
        output.push_str(&format!("{}\n", "Aggregated ranking:".cyan().bold()));
        for (place, &index) in result.stage2.aggregated_ranking.iter().enumerate() {
            let model = result
                .stage1
                .responses
                .get(index)
                .map(|r| r.model_id.as_str())
                .unwrap_or("?");
            let score = result.stage2.scores.get(index).copied().unwrap_or_default();
            output.push_str(&format!(
                "  {}. Response {} ({}) score {:.1}\n",
                place + 1,
                response_label(index),
                model,
                score
            ));
        }
        for evaluation in &result.stage2.evaluations {
            let order: Vec<String> = evaluation.ordering().into_iter().map(response_label).collect();
            let line = format!("  {} ranked {}", evaluation.evaluator_model_id, order.join(" > "));
            match &evaluation.error {
                None => output.push_str(&format!("{}\n", line.dimmed())),
                Some(error) => output.push_str(&format!("{} {}\n", line.dimmed(), format!("(failed: {})", error).red())),
            }
        }

        // Stage 3
        output.push_str(&Self::section_header("Stage 3: Synthesis"));
        if let Some(error) = &result.stage3.error {
            output.push_str(&format!(
                "\n{}\n",
                format!("Chairman failed ({}); showing the top-ranked response", error).red()
            ));
        }
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Confidence: {}/100", result.stage3.confidence).yellow().bold(),
            result.stage3.final_response
        ));
        if !result.stage3.reasoning.is_empty() {
            output.push_str(&format!("\n{}\n{}\n", "Reasoning:".cyan().bold(), result.stage3.reasoning));
        }

        output.push_str(&Self::totals(result));
        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(result: &CouncilResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format synthesis only (concise output)
    pub fn format_synthesis_only(result: &CouncilResult) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n\n", "=== LLM Council Conclusion ===".cyan().bold()));
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), result.prompt));

        let models: Vec<&str> = result.stage1.responses.iter().map(|r| r.model_id.as_str()).collect();
        output.push_str(&format!("{} {}\n\n", "Models consulted:".dimmed(), models.join(", ")));

        output.push_str(&result.stage3.final_response);
        output.push('\n');
        output.push_str(&Self::totals(result));
        output
    }

    /// Summarize an orchestration run: every wave's branches, then its merge
    pub fn format_plan(plan: &WavePlan, graph: &Graph) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Council Run"));
        output.push('\n');

        for wave in 0..plan.wave_count {
            output.push_str(&Self::section_header(&format!("Wave {}", wave + 1)));
            for branch in plan.branches_in_wave(wave) {
                let preview = graph
                    .node(&branch.node_id)
                    .and_then(|n| n.response.as_deref())
                    .map(|r| clip(first_line(r), PREVIEW_CHARS))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "  {} {}/{} {}\n",
                    Self::status_mark(branch.status),
                    branch.provider_id,
                    branch.model_id,
                    preview.dimmed()
                ));
                if let Some(error) = &branch.error {
                    output.push_str(&format!("      {}\n", error.red()));
                }
            }

            for merge in plan.merges.iter().filter(|m| m.wave == wave) {
                output.push_str(&format!(
                    "\n  {} {} {}/{}\n",
                    Self::status_mark(merge.status),
                    "merge".bold(),
                    merge.provider_id,
                    merge.model_id
                ));
                if let Some(error) = &merge.error {
                    output.push_str(&format!("      {}\n", error.red()));
                }
                if let Some(response) = graph.node(&merge.output_node_id).and_then(|n| n.response.as_deref()) {
                    output.push_str(&format!("\n{}\n", Self::indent(response, "    ")));
                }
            }
        }

        output.push_str(&format!(
            "\n{} {} waves, {} branches, {} errors\n",
            "Summary:".cyan().bold(),
            plan.wave_count,
            plan.branches.len(),
            plan.error_count()
        ));
        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_plan_json(plan: &WavePlan) -> String {
        serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string())
    }

    /// Registry listing; `configured` tells whether a model's provider is usable
    pub fn format_models(models: &[ModelRef], configured: impl Fn(&ModelRef) -> bool) -> String {
        let mut output = String::new();
        let mut current = None;

        for model in models {
            if current != Some(model.provider) {
                current = Some(model.provider);
                let status = if configured(model) {
                    "configured".green()
                } else {
                    "not configured".dimmed()
                };
                output.push_str(&format!("\n{} ({})\n", model.provider.display_name().cyan().bold(), status));
            }
            let pricing = registry::lookup(&model.model_id)
                .map(|info| {
                    format!(
                        "ctx {:>7}  ${:.5}/1k in  ${:.5}/1k out",
                        info.context_window, info.cost_per_1k_input, info.cost_per_1k_output
                    )
                })
                .unwrap_or_default();
            output.push_str(&format!("  {:<40} {}\n", model.to_string(), pricing.dimmed()));
        }
        output
    }

    fn status_mark(status: RunStatus) -> String {
        match status {
            RunStatus::Done => "v".green().to_string(),
            RunStatus::Error => "x".red().to_string(),
            RunStatus::Running => "~".yellow().to_string(),
            RunStatus::Queued => "·".dimmed().to_string(),
        }
    }

    fn totals(result: &CouncilResult) -> String {
        format!(
            "\n{}\n",
            format!("{}ms · ${:.4}", result.total_latency_ms, result.total_cost).dimmed()
        )
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
