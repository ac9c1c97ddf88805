//! Single-node execution
//!
//! [`NodeQueryExecutor`] is the default [`NodeExecutor`]: it queries a
//! node's model with its prompt, using the healthy responses of its parent
//! nodes as context, and writes the answer (or an error-marked string)
//! back into the graph.

use crate::ports::graph_store::GraphStore;
use crate::ports::llm_gateway::{LlmGateway, QueryRequest};
use crate::ports::node_executor::{NodeExecutionError, NodeExecutor};
use async_trait::async_trait;
use council_domain::graph::{error_text, is_error_text};
use council_domain::{Graph, GraphNode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes one graph node against its configured model
pub struct NodeQueryExecutor<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    graph: Arc<dyn GraphStore>,
}

impl<G: LlmGateway + 'static> NodeQueryExecutor<G> {
    pub fn new(gateway: Arc<G>, graph: Arc<dyn GraphStore>) -> Self {
        Self { gateway, graph }
    }
}

/// Upstream context block built from parents with a usable response
fn upstream_context(graph: &Graph, node: &GraphNode) -> Option<String> {
    let blocks: Vec<String> = graph
        .parents(&node.id)
        .into_iter()
        .filter_map(|parent| {
            let response = parent.response.as_deref()?;
            if response.trim().is_empty() || is_error_text(response) {
                return None;
            }
            let source = parent
                .model
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "upstream".to_string());
            Some(format!("--- {} ---\n{}", source, response))
        })
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(format!("Context from connected nodes:\n\n{}", blocks.join("\n\n")))
    }
}

#[async_trait]
impl<G: LlmGateway + 'static> NodeExecutor for NodeQueryExecutor<G> {
    async fn execute_node(&self, node_id: &str, cancel: &CancellationToken) -> Result<(), NodeExecutionError> {
        let graph = self.graph.snapshot();
        let node = graph
            .node(node_id)
            .ok_or_else(|| NodeExecutionError::NodeNotFound(node_id.to_string()))?;
        let model = node
            .model
            .clone()
            .ok_or_else(|| NodeExecutionError::NoModel(node_id.to_string()))?;

        let request = QueryRequest::new(model.clone())
            .with_optional_system(upstream_context(&graph, node))
            .with_user(node.prompt.clone());

        debug!("Executing node {} with {}", node_id, model);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(NodeExecutionError::Cancelled),
            response = self.gateway.query(request) => response,
        };
        if cancel.is_cancelled() {
            debug!("Dropping late response for node {}", node_id);
            return Err(NodeExecutionError::Cancelled);
        }

        let id = node_id.to_string();
        match response.error_message() {
            None => {
                let content = response.content;
                self.graph
                    .update(Box::new(move |g| g.with_node_response(&id, content)));
                Ok(())
            }
            Some(error) => {
                warn!("Node {} ({}) failed: {}", node_id, model, error);
                let text = error_text(&error);
                self.graph.update(Box::new(move |g| g.with_node_response(&id, text)));
                Err(NodeExecutionError::QueryFailed(error))
            }
        }
    }
}
