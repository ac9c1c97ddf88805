//! Application layer for llm-council
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestratorParams;
pub use ports::{
    credential_store::CredentialStore,
    graph_store::{GraphStore, GraphUpdate},
    llm_gateway::{
        ChatMessage, FinishReason, GatewayError, LlmGateway, ModelFailure, MultiQueryRequest,
        MultiQueryResponse, ParallelQueryResult, QueryRequest, QueryResponse, Role, TokenUsage,
    },
    node_executor::{NodeExecutionError, NodeExecutor},
    progress::{CouncilProgressNotifier, NoNotifier, NoProgress, Notifier},
    run_logger::{NoRunLogger, RunEvent, RunLogger},
};
pub use use_cases::autonomous_council::{AutonomousCouncilUseCase, AutonomousInput};
pub use use_cases::council_plan::{CouncilPlanInput, CouncilPlanUseCase, build_static_plan};
pub use use_cases::execute_node::NodeQueryExecutor;
pub use use_cases::orchestration_error::OrchestrationError;
pub use use_cases::run_council::{RunCouncilError, RunCouncilInput, RunCouncilUseCase};
pub use use_cases::run_registry::{DEFAULT_CHAT, RunRegistry};
