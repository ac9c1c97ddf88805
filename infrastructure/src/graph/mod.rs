//! Graph state adapters
//!
//! [`InMemoryGraphStore`] implements the
//! [`GraphStore`](council_application::GraphStore) port with a bounded
//! undo/redo history. [`load_graph`] reads a graph exported as JSON.

mod history;
mod import;

pub use history::{DEFAULT_HISTORY_LIMIT, InMemoryGraphStore};
pub use import::{GraphImportError, load_graph, parse_graph};
