//! Structured logging for the engine and its CLI.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for pipelines
//!
//! stdout is reserved for command payloads; all log output goes to stderr.
//! Engine code logs with `tracing` macros whose target is a dotted event
//! name from [`event_names`].

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogEvent, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. Event targets
/// are dotted names rather than module paths, so the filter is a plain level
/// directive.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .parse_lossy("");

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(use_ansi);

            if config.timestamps {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init();
            } else {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init();
            }
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid.simple().to_string()[..12])
}
