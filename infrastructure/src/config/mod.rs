//! Configuration file loading for llm-council
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./council.toml` or `./.council.toml`
//! 3. Global: `$XDG_CONFIG_HOME/llm-council/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FALLBACK_COUNCIL, FileConfig, FileCouncilConfig, FileEvaluatorsConfig, FileLoggingConfig,
    FileMemberConfig, FileOrchestratorConfig, FileOutputConfig, FileProviderConfig, FileProvidersConfig,
};
pub use loader::ConfigLoader;
