use council_domain::Graph;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphImportError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
}

/// Parse a `{ "nodes": [...], "connections": [...] }` document.
///
/// Connections whose endpoints are missing are dropped.
pub fn parse_graph(json: &str) -> Result<Graph, GraphImportError> {
    let mut graph: Graph = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(GraphImportError::DuplicateNode(node.id.clone()));
        }
    }

    let ids: HashSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    graph
        .connections
        .retain(|c| ids.contains(&c.from) && ids.contains(&c.to));
    Ok(graph)
}

pub fn load_graph(path: &Path) -> Result<Graph, GraphImportError> {
    let json = std::fs::read_to_string(path).map_err(|source| GraphImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_graph(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_graph() {
        let json = r#"{
            "nodes": [
                {"id": "root", "kind": "prompt", "prompt": "Compare sorting algorithms", "model": {"provider": "openai", "model_id": "gpt-4o"}},
                {"id": "child", "prompt": "Focus on stability"}
            ],
            "connections": [
                {"id": "c1", "from": "root", "to": "child"},
                {"id": "c2", "from": "root", "to": "ghost"}
            ]
        }"#;
        let graph = parse_graph(json).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.connections.len(), 1);
        assert_eq!(graph.children("root")[0].id, "child");
        assert!(graph.node("root").unwrap().model.is_some());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"nodes": [{"id": "a"}, {"id": "a"}]}"#;
        assert!(matches!(parse_graph(json), Err(GraphImportError::DuplicateNode(id)) if id == "a"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_graph(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, GraphImportError::Io { .. }));
    }
}
