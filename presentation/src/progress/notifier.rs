//! Toast-style notifications for wave runs

use colored::Colorize;
use council_application::Notifier;
use council_domain::Severity;

/// Prints notifications to stderr, colored by severity
pub struct ConsoleNotifier {
    /// Also print intermediate planner steps
    show_steps: bool,
}

impl ConsoleNotifier {
    pub fn new(show_steps: bool) -> Self {
        Self { show_steps }
    }

    fn line(message: &str, severity: Severity) -> String {
        match severity {
            Severity::Error => format!("{} {}", "error:".red().bold(), message),
            Severity::Warning => format!("{} {}", "warning:".yellow().bold(), message),
            Severity::Info => format!("{} {}", "info:".cyan(), message),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        eprintln!("{}", Self::line(message, severity));
    }

    fn on_thinking_step(&self, step: &str) {
        if self.show_steps {
            eprintln!("{} {}", "->".cyan(), step.dimmed());
        }
    }
}
