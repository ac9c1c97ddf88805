//! Graph collaborator port
//!
//! The orchestrators read the graph through snapshots and write it only
//! through updater functions that return a new graph.

use council_domain::Graph;

/// Pure graph transformation
pub type GraphUpdate = Box<dyn FnOnce(Graph) -> Graph + Send>;

/// Handle on the in-memory graph state
pub trait GraphStore: Send + Sync {
    /// Current graph
    fn snapshot(&self) -> Graph;

    /// Replace the current graph with `update(current)`
    fn update(&self, update: GraphUpdate);

    /// Replace the current graph wholesale
    fn replace(&self, graph: Graph) {
        self.update(Box::new(move |_| graph));
    }
}
