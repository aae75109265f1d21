//! Structured event definitions for logging.
//!
//! Every engine log line carries a dotted event name as its tracing target
//! (see [`event_names`]) so JSONL consumers can filter on stable keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Processing stages of the engine pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Structure derivation from rows.
    Structure,
    /// CPT synthesis.
    Cpt,
    /// Network fitting.
    Fit,
    /// Junction-tree inference.
    Infer,
    /// Propagation and critical-path analysis.
    Analysis,
}

impl Stage {
    /// Stage owning a dotted event name, by its first segment.
    pub fn of_event(event: &str) -> Option<Stage> {
        match event.split('.').next()? {
            "run" | "config" => Some(Stage::Init),
            "structure" => Some(Stage::Structure),
            "cpt" => Some(Stage::Cpt),
            "fit" => Some(Stage::Fit),
            "infer" | "discretize" => Some(Stage::Infer),
            "analysis" => Some(Stage::Analysis),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Structure => "structure",
            Stage::Cpt => "cpt",
            Stage::Fit => "fit",
            Stage::Infer => "infer",
            Stage::Analysis => "analysis",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";

    // Structure stage
    pub const STRUCTURE_ROW_SKIPPED: &str = "structure.row_skipped";
    pub const STRUCTURE_ID_COLLISION: &str = "structure.id_collision";
    pub const STRUCTURE_BUILT: &str = "structure.built";

    // CPT stage
    pub const CPT_INSUFFICIENT_DATA: &str = "cpt.insufficient_data";
    pub const CPT_FROM_DATA: &str = "cpt.from_data";
    pub const CPT_DEFAULTS: &str = "cpt.defaults";

    // Fit stage
    pub const FIT_CYCLE_BROKEN: &str = "fit.cycle_broken";
    pub const FIT_FINISHED: &str = "fit.finished";

    // Infer stage
    pub const INFER_NO_NETWORK: &str = "infer.no_network";
    pub const INFER_COMPILED: &str = "infer.compiled";
    pub const INFER_BACKEND_UNAVAILABLE: &str = "infer.backend_unavailable";
    pub const INFER_EVIDENCE_REJECTED: &str = "infer.evidence_rejected";
    pub const INFER_QUERY_UNKNOWN: &str = "infer.query_unknown";
    pub const INFER_FAILED: &str = "infer.failed";
    pub const INFER_FINISHED: &str = "infer.finished";
    pub const DISCRETIZE_NEGATIVE: &str = "discretize.negative";
    pub const DISCRETIZE_LEVELS: &str = "discretize.levels";

    // Analysis stage
    pub const ANALYSIS_NO_NETWORK: &str = "analysis.no_network";
    pub const ANALYSIS_ROOT_SKIPPED: &str = "analysis.root_skipped";
    pub const ANALYSIS_PATHS_RANKED: &str = "analysis.paths_ranked";
}

/// One structured log record as written by the JSONL layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Event name (e.g., "structure.row_skipped").
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional structured fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(level: Level, event: impl Into<String>) -> Self {
        let event = event.into();
        LogEvent {
            ts: Utc::now(),
            level,
            stage: Stage::of_event(&event),
            event,
            run_id: None,
            message: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Add a field to the event.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}
