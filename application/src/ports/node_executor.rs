//! Port for running a query on one existing graph node

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeExecutionError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node {0} has no model configured")]
    NoModel(String),

    #[error("{0}")]
    QueryFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Executes a node's prompt and writes the outcome back into the graph.
///
/// Once `cancel` fires the graph must not be written any more; the call
/// returns [`NodeExecutionError::Cancelled`] instead.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute_node(&self, node_id: &str, cancel: &CancellationToken) -> Result<(), NodeExecutionError>;
}
