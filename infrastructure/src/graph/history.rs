use council_application::{GraphStore, GraphUpdate};
use council_domain::Graph;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Past snapshots kept for undo
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Default)]
struct History {
    past: VecDeque<Graph>,
    present: Graph,
    future: Vec<Graph>,
}

/// Graph held in memory as a past/present/future triple.
///
/// Every update pushes the previous present onto `past` and clears
/// `future`, so concurrent writers never lose each other's changes:
/// each updater sees the graph produced by the one before it.
#[derive(Debug)]
pub struct InMemoryGraphStore {
    state: Mutex<History>,
    limit: usize,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new(Graph::default())
    }
}

impl InMemoryGraphStore {
    pub fn new(graph: Graph) -> Self {
        Self {
            state: Mutex::new(History {
                present: graph,
                ..History::default()
            }),
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Keep at most `limit` undo steps
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn lock(&self) -> MutexGuard<'_, History> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Step back one update. Returns false when there is nothing to undo.
    pub fn undo(&self) -> bool {
        let mut state = self.lock();
        let Some(previous) = state.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut state.present, previous);
        state.future.push(current);
        true
    }

    /// Re-apply the last undone update. Returns false when there is nothing to redo.
    pub fn redo(&self) -> bool {
        let mut state = self.lock();
        let Some(next) = state.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut state.present, next);
        state.past.push_back(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.lock().past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.lock().future.is_empty()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn snapshot(&self) -> Graph {
        self.lock().present.clone()
    }

    fn update(&self, update: GraphUpdate) {
        let mut state = self.lock();
        let current = std::mem::take(&mut state.present);
        state.present = update(current.clone());
        state.past.push_back(current);
        while state.past.len() > self.limit {
            state.past.pop_front();
        }
        state.future.clear();
    }
}
