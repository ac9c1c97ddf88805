//! Progress notification ports
//!
//! - [`CouncilProgressNotifier`] receives per-stage progress from the
//!   council engine.
//! - [`Notifier`] is the fire-and-forget toast sink used by the wave
//!   orchestrators.

use council_domain::{CouncilProgress, CouncilStage, Severity};

/// Callback for progress updates during council execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait CouncilProgressNotifier: Send + Sync {
    /// Called when a stage starts
    fn on_stage_start(&self, stage: CouncilStage, total_tasks: usize);

    /// Called once per completed task with the cumulative percentage
    fn on_progress(&self, progress: &CouncilProgress);

    /// Called when a stage completes
    fn on_stage_complete(&self, stage: CouncilStage);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl CouncilProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: CouncilStage, _total_tasks: usize) {}
    fn on_progress(&self, _progress: &CouncilProgress) {}
    fn on_stage_complete(&self, _stage: CouncilStage) {}
}

/// User-facing notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);

    /// Intermediate step of an autonomous run ("Planning wave 2", ...)
    fn on_thinking_step(&self, _step: &str) {}
}

/// Discards every notification
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn notify(&self, _message: &str, _severity: Severity) {}
}
