//! Infrastructure layer for llm-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: HTTP provider adapters behind a routing
//! gateway, the credential store, configuration file loading, the
//! in-memory graph store and the JSONL run logger.

pub mod config;
pub mod credentials;
pub mod graph;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, FileOutputConfig};
pub use credentials::StaticCredentialStore;
pub use graph::{InMemoryGraphStore, load_graph};
pub use logging::JsonlRunLogger;
pub use providers::error::ProviderError;
pub use providers::routing::RoutingGateway;
pub use providers::{Completion, ProviderAdapter};
