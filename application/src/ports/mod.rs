//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod credential_store;
pub mod graph_store;
pub mod llm_gateway;
pub mod node_executor;
pub mod progress;
pub mod run_logger;
