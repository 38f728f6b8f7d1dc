//! Presentation layer for the headless binary.

/// Log-backed observers and notifier.
pub mod log_sink;

pub use log_sink::{LogNotifier, LogObserver, LogPlayer, LogSink, render_summary};
