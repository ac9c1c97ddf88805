//! Node graph the orchestrators read from and write into

pub mod entities;
pub mod layout;

pub use entities::{
    Connection, ERROR_MARKER, Graph, GraphNode, NodeKind, Position, error_text, is_error_text,
};
pub use layout::{DEFAULT_BRANCH_RADIUS, branch_positions, merge_position};
