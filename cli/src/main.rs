//! CLI entrypoint for llm-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser};
use council_application::{
    AutonomousCouncilUseCase, AutonomousInput, CouncilPlanInput, CouncilPlanUseCase, CouncilProgressNotifier,
    CredentialStore, GraphStore, LlmGateway, NoProgress, NoRunLogger, NodeQueryExecutor, OrchestrationError, OrchestratorParams,
    RunCouncilInput, RunCouncilUseCase, RunLogger,
};
use council_domain::core::registry;
use council_domain::core::validation::has_errors;
use council_domain::{Graph, GraphNode, ModelRef, NodeKind, OutputFormat, Position, Severity, WavePlan};
use council_infrastructure::{
    ConfigLoader, FileConfig, InMemoryGraphStore, JsonlRunLogger, RoutingGateway, StaticCredentialStore, load_graph,
};
use council_presentation::{Cli, Command, ConsoleFormatter, ConsoleNotifier, ProgressReporter, SimpleProgress};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Per-request HTTP timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Everything the sub-commands share
struct App {
    config: FileConfig,
    params: OrchestratorParams,
    gateway: Arc<RoutingGateway>,
    credentials: Arc<StaticCredentialStore>,
    logger: Arc<dyn RunLogger>,
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    let app = App::build(config, cli.quiet)?;

    info!("Starting llm-council");

    match command {
        Command::Ask {
            question,
            council,
            output,
        } => app.ask(&question, council.as_deref(), output.map(Into::into)).await,
        Command::Auto { question, depth, json } => app.auto(&question, depth, json).await,
        Command::Plan {
            graph,
            root,
            depth,
            json,
        } => app.plan(&graph, &root, depth, json).await,
        Command::Models { test } => app.models(test).await,
    }
}

/// stderr output filtered by `-v`, plus an optional non-blocking file writer
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(level)),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            token.cancel();
        }
    });
}

impl App {
    fn build(config: FileConfig, quiet: bool) -> Result<Self> {
        let issues = config.validate();
        for issue in &issues {
            match issue.severity {
                Severity::Error => eprintln!("config error: {}", issue.message),
                _ => warn!("{}", issue.message),
            }
        }
        if has_errors(&issues) {
            bail!("Invalid configuration");
        }

        if !config.output.color {
            colored::control::set_override(false);
        }

        let credentials = Arc::new(StaticCredentialStore::from_config(&config.providers));
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let gateway = Arc::new(RoutingGateway::with_default_adapters(client));
        gateway.configure(&credentials.credentials());

        let logger: Arc<dyn RunLogger> = match config.logging.run_log.as_deref().and_then(JsonlRunLogger::new) {
            Some(logger) => {
                info!("Run log: {}", logger.path().display());
                Arc::new(logger)
            }
            None => Arc::new(NoRunLogger),
        };

        let (params, _) = config.orchestrator.to_params();

        Ok(Self {
            config,
            params,
            gateway,
            credentials,
            logger,
            quiet,
        })
    }

    async fn ask(&self, question: &str, council_id: Option<&str>, format: Option<OutputFormat>) -> Result<ExitCode> {
        let council_id = council_id.unwrap_or_else(|| self.config.default_council_id());
        let council = self.config.council(council_id)?;
        let format = format.or(self.config.output.format).unwrap_or_default();

        let token = CancellationToken::new();
        cancel_on_ctrl_c(token.clone());
        let use_case = RunCouncilUseCase::new(Arc::clone(&self.gateway))
            .with_logger(Arc::clone(&self.logger))
            .with_cancellation(token);

        let progress: Box<dyn CouncilProgressNotifier> = if self.quiet || format == OutputFormat::Json {
            Box::new(NoProgress)
        } else if self.config.output.show_progress {
            Box::new(ProgressReporter::new())
        } else {
            Box::new(SimpleProgress)
        };

        let input = RunCouncilInput::new(council, question);
        match use_case.execute_with_progress(input, progress.as_ref()).await {
            Ok(result) => {
                println!("{}", ConsoleFormatter::render(&result, format));
                Ok(ExitCode::SUCCESS)
            }
            Err(e) if e.is_cancelled() => Ok(ExitCode::from(130)),
            Err(e) => Err(e.into()),
        }
    }

    async fn auto(&self, question: &str, depth: Option<usize>, json: bool) -> Result<ExitCode> {
        let root = GraphNode::new(NodeKind::Prompt, question, Position::default());
        let root_id = root.id.clone();
        let graph = Arc::new(InMemoryGraphStore::new(Graph::default().with_node(root)));

        let use_case = Arc::new(
            AutonomousCouncilUseCase::new(
                Arc::clone(&self.gateway),
                self.credentials.clone(),
                graph.clone(),
            )
            .with_notifier(Arc::new(ConsoleNotifier::new(!self.quiet)))
            .with_logger(Arc::clone(&self.logger))
            .with_params(self.params.clone()),
        );

        let token = CancellationToken::new();
        cancel_on_ctrl_c(token.clone());
        let aborter = Arc::clone(&use_case);
        tokio::spawn(async move {
            token.cancelled().await;
            aborter.abort();
        });

        let input = AutonomousInput::new(root_id, depth.unwrap_or(self.params.default_depth)).with_question(question);
        let result = use_case.start(input).await;
        Ok(self.report_plan(result, &graph.snapshot(), json))
    }

    async fn plan(&self, path: &Path, root: &str, depth: Option<usize>, json: bool) -> Result<ExitCode> {
        let graph = load_graph(path).with_context(|| format!("Failed to load graph {}", path.display()))?;
        let store = Arc::new(InMemoryGraphStore::new(graph));
        let executor = Arc::new(NodeQueryExecutor::new(Arc::clone(&self.gateway), store.clone()));

        let use_case = Arc::new(
            CouncilPlanUseCase::new(store.clone(), executor)
                .with_notifier(Arc::new(ConsoleNotifier::new(!self.quiet)))
                .with_logger(Arc::clone(&self.logger)),
        );

        let token = CancellationToken::new();
        cancel_on_ctrl_c(token.clone());
        let aborter = Arc::clone(&use_case);
        tokio::spawn(async move {
            token.cancelled().await;
            aborter.abort();
        });

        let input = CouncilPlanInput::new(root, depth.unwrap_or(self.params.default_depth));
        let result = use_case.start(input).await;
        Ok(self.report_plan(result, &store.snapshot(), json))
    }

    /// Print a finished plan. Failures were already shown by the notifier.
    fn report_plan(&self, result: Result<WavePlan, OrchestrationError>, graph: &Graph, json: bool) -> ExitCode {
        match result {
            Ok(plan) if json => {
                println!("{}", ConsoleFormatter::format_plan_json(&plan));
                ExitCode::SUCCESS
            }
            Ok(plan) => {
                println!("{}", ConsoleFormatter::format_plan(&plan, graph));
                ExitCode::SUCCESS
            }
            Err(e) if e.is_cancelled() => ExitCode::from(130),
            Err(_) => ExitCode::FAILURE,
        }
    }

    async fn models(&self, test: bool) -> Result<ExitCode> {
        let mut models: Vec<ModelRef> = registry::all_models()
            .iter()
            .map(|info| ModelRef::new(info.provider, info.id))
            .collect();
        models.sort_by_key(|m| m.provider);

        let credentials = &self.credentials;
        print!(
            "{}",
            ConsoleFormatter::format_models(&models, |m| credentials.is_usable(m.provider))
        );

        if !test {
            return Ok(ExitCode::SUCCESS);
        }

        println!("\nConnection test:");
        let mut failed = false;
        for provider in self.credentials.usable_providers() {
            match self.gateway.test_connection(provider).await {
                Ok(()) => println!("  ok      {}", provider.display_name()),
                Err(e) => {
                    failed = true;
                    println!("  failed  {}: {}", provider.display_name(), e);
                }
            }
        }
        if self.gateway.available_models().is_empty() {
            println!("  no provider is configured");
        }

        Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
    }
}
