pub mod config;
pub mod error;
pub mod histogram;
pub mod labels;
pub mod scrape;
pub mod store;
pub mod ui;
pub mod view;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file written while the full-screen view owns the terminal
pub const LOG_FILE: &str = "metrics-viewer.log";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize tracing/logging to stderr
///
/// Note: This function can only be called once per process.
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Initialize tracing/logging to `<directory>/metrics-viewer.log`
///
/// The returned guard flushes buffered lines on drop and must be held until
/// the process exits.
pub fn init_file_tracing(directory: &Path, default_level: &str) -> WorkerGuard {
    let appender = tracing_appender::rolling::never(directory, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    guard
}
