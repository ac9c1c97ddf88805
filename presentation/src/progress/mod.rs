//! Progress and notification sinks for the console

pub mod notifier;
pub mod reporter;
