//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every stage: responses, rankings, synthesis
    Full,
    /// Only the final synthesis
    Synthesis,
    /// JSON output
    Json,
}

impl From<OutputFormat> for council_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => council_domain::OutputFormat::Full,
            OutputFormat::Synthesis => council_domain::OutputFormat::Synthesis,
            OutputFormat::Json => council_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(author, version, about = "LLM Council - several models answer, rank each other, and a chairman decides")]
#[command(long_about = r#"
llm-council asks a council of LLMs one question in three stages:
1. Divergence: every member answers independently
2. Convergence: evaluators rank the anonymized answers
3. Synthesis: a chairman writes the final answer from the ranking

`auto` instead explores a question in waves of parallel branches,
each wave closed by a merge, on an in-memory graph.

Configuration files are loaded from (in priority order):
1. --config <path>                      Explicit config file
2. ./council.toml                       Project-level config
3. ~/.config/llm-council/config.toml    Global config

Example:
  llm-council ask "What's the best way to handle errors in Rust?"
  llm-council ask --council debate -o full "Tabs or spaces?"
  llm-council auto --depth 3 "Design a rate limiter"
  llm-council plan --graph session.json --root n1
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one council on a question
    Ask {
        /// The question to ask the council
        question: String,

        /// Council id (configured or preset: balanced, debate, quick)
        #[arg(short, long, value_name = "ID")]
        council: Option<String>,

        /// Output format (default: from config, else synthesis)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Explore a question autonomously in waves of branches and merges
    Auto {
        /// The question to explore
        question: String,

        /// Number of waves (1-6)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print the plan as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Execute an existing graph wave by wave, breadth-first from a root node
    Plan {
        /// Graph JSON file (`{ "nodes": [...], "connections": [...] }`)
        #[arg(short, long, value_name = "FILE")]
        graph: PathBuf,

        /// Id of the root node
        #[arg(short, long, value_name = "ID")]
        root: String,

        /// Number of BFS layers to execute (1-6)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Print the plan as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List known models and which providers are configured
    Models {
        /// Send a minimal request to every configured provider
        #[arg(long)]
        test: bool,
    },
}
