//! Graph value types: nodes, connections and the graph itself
//!
//! A [`Graph`] is never mutated in place. Every `with_*` method consumes the
//! graph and returns the next version, which keeps updates compatible with an
//! undo/redo history.

use crate::core::model::ModelRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Prefix that marks a node response as a failure
pub const ERROR_MARKER: &str = "⚠ Error: ";

/// Render a failure for display on a node
pub fn error_text(message: &str) -> String {
    format!("{}{}", ERROR_MARKER, message)
}

pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Prompt,
    Branch,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Model this node queries, if configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelRef>,
    #[serde(default)]
    pub position: Position,
}

impl GraphNode {
    /// New node with a fresh id
    pub fn new(kind: NodeKind, prompt: impl Into<String>, position: Position) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            prompt: prompt.into(),
            response: None,
            model: None,
            position,
        }
    }

    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn has_error(&self) -> bool {
        self.response.as_deref().is_some_and(is_error_text)
    }
}

/// Directed edge `from → to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = GraphNode>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_connections(mut self, connections: impl IntoIterator<Item = Connection>) -> Self {
        self.connections.extend(connections);
        self
    }

    /// Set a node's response; unknown ids leave the graph unchanged
    pub fn with_node_response(mut self, id: &str, response: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.response = Some(response.into());
        }
        self
    }

    /// Targets of edges leaving `id`, in connection order
    pub fn children(&self, id: &str) -> Vec<&GraphNode> {
        self.connections
            .iter()
            .filter(|c| c.from == id)
            .filter_map(|c| self.node(&c.to))
            .collect()
    }

    /// Sources of edges entering `id`, in connection order
    pub fn parents(&self, id: &str) -> Vec<&GraphNode> {
        self.connections
            .iter()
            .filter(|c| c.to == id)
            .filter_map(|c| self.node(&c.from))
            .collect()
    }

    /// Breadth-first layers below `root`: element `k` holds the
    /// `(parent_id, node)` pairs first reached at depth `k + 1`.
    ///
    /// Each node appears once. Stops after `max_layers` layers.
    pub fn bfs_layers(&self, root: &str, max_layers: usize) -> Vec<Vec<(String, &GraphNode)>> {
        let mut layers = Vec::new();
        if !self.contains(root) {
            return layers;
        }

        let mut visited: HashSet<&str> = HashSet::from([root]);
        let mut frontier: VecDeque<&str> = VecDeque::from([root]);

        while layers.len() < max_layers && !frontier.is_empty() {
            let mut layer = Vec::new();
            let mut next = VecDeque::new();

            for parent in frontier {
                for child in self.children(parent) {
                    if visited.insert(child.id.as_str()) {
                        layer.push((parent.to_string(), child));
                        next.push_back(child.id.as_str());
                    }
                }
            }

            if layer.is_empty() {
                break;
            }
            layers.push(layer);
            frontier = next;
        }

        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ProviderId;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind: NodeKind::Prompt,
            prompt: format!("prompt {}", id),
            response: None,
            model: Some(ModelRef::new(ProviderId::OpenAi, "gpt-4o")),
            position: Position::default(),
        }
    }

    fn edge(from: &str, to: &str) -> Connection {
        Connection {
            id: format!("{}-{}", from, to),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn diamond() -> Graph {
        // root → a, b; a → c; b → c; c → d
        Graph::new()
            .with_nodes(["root", "a", "b", "c", "d"].map(node))
            .with_connections([
                edge("root", "a"),
                edge("root", "b"),
                edge("a", "c"),
                edge("b", "c"),
                edge("c", "d"),
            ])
    }

    #[test]
    fn test_error_marker() {
        let text = error_text("HTTP 500");
        assert!(is_error_text(&text));
        assert!(!is_error_text("fine"));
        assert!(node("x").with_response(text).has_error());
    }

    #[test]
    fn test_with_node_response_is_copy_on_write() {
        let before = diamond();
        let after = before.clone().with_node_response("a", "answer");
        assert_eq!(before.node("a").unwrap().response, None);
        assert_eq!(after.node("a").unwrap().response.as_deref(), Some("answer"));
    }

    #[test]
    fn test_children_and_parents() {
        let graph = diamond();
        let children: Vec<_> = graph.children("root").iter().map(|n| n.id.clone()).collect();
        assert_eq!(children, vec!["a", "b"]);
        let parents: Vec<_> = graph.parents("c").iter().map(|n| n.id.clone()).collect();
        assert_eq!(parents, vec!["a", "b"]);
    }

    #[test]
    fn test_bfs_layers_visit_each_node_once() {
        let graph = diamond();
        let layers = graph.bfs_layers("root", 6);
        let ids: Vec<Vec<&str>> = layers
            .iter()
            .map(|l| l.iter().map(|(_, n)| n.id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
        assert_eq!(layers[1][0].0, "a");
    }

    #[test]
    fn test_bfs_layers_respects_limit() {
        assert_eq!(diamond().bfs_layers("root", 2).len(), 2);
    }

    #[test]
    fn test_bfs_layers_missing_root_or_leaf() {
        assert!(diamond().bfs_layers("nope", 6).is_empty());
        assert!(diamond().bfs_layers("d", 6).is_empty());
    }

    #[test]
    fn test_graph_json_roundtrip_with_defaults() {
        let json = r#"{"nodes":[{"id":"n1","prompt":"hi","model":{"provider":"anthropic","model_id":"claude-3-5-haiku-20241022"}}],"connections":[]}"#;
        let graph: Graph = serde_json::from_str(json).unwrap();
        let n1 = graph.node("n1").unwrap();
        assert_eq!(n1.kind, NodeKind::Prompt);
        assert_eq!(n1.model.as_ref().unwrap().provider, ProviderId::Anthropic);
    }
}
