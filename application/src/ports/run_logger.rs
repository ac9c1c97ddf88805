//! Port for structured run logging.
//!
//! Defines the [`RunLogger`] trait for recording run events (council
//! completions, planned waves, branch and merge outcomes, aborts) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable record of each run (JSONL).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A structured run event.
pub struct RunEvent {
    /// Event type identifier (e.g., "council_completed", "wave_planned").
    pub event_type: &'static str,
    pub timestamp: DateTime<Utc>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl RunEvent {
    /// Create a new event stamped with the current UTC time.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Port for logging run events.
///
/// `log` is synchronous and infallible; logging failures never disturb a run.
pub trait RunLogger: Send + Sync {
    fn log(&self, event: RunEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoRunLogger;

impl RunLogger for NoRunLogger {
    fn log(&self, _event: RunEvent) {}
}
