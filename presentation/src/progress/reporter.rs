//! Progress reporting for council execution

use colored::Colorize;
use council_application::CouncilProgressNotifier;
use council_domain::{CouncilProgress, CouncilStage};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};

/// Reports progress during council execution with one bar per stage
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CouncilProgressNotifier for ProgressReporter {
    fn on_stage_start(&self, stage: CouncilStage, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(stage.to_string());
        pb.set_message("Starting...");

        *self.stage_bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn on_progress(&self, progress: &CouncilProgress) {
        if let Some(pb) = self.stage_bar.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            pb.set_message(progress.message.clone());
            pb.inc(1);
        }
    }

    fn on_stage_complete(&self, stage: CouncilStage) {
        if let Some(pb) = self.stage_bar.lock().unwrap_or_else(PoisonError::into_inner).take() {
            pb.finish_with_message(format!("{} complete!", stage.display_name().green()));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl CouncilProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: CouncilStage, total_tasks: usize) {
        eprintln!("{} {} ({} tasks)", "->".cyan(), stage.to_string().bold(), total_tasks);
    }

    fn on_progress(&self, progress: &CouncilProgress) {
        eprintln!("  {:>3}% {}", progress.progress, progress.message);
    }

    fn on_stage_complete(&self, _stage: CouncilStage) {
        eprintln!();
    }
}
