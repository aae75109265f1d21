//! Custom tracing layer for JSONL output.
//!
//! This layer produces machine-parseable JSONL logs on stderr while
//! keeping stdout clean for command payloads.

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::{Level, LogEvent};

/// Run correlation stored on spans.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
}

/// A visitor that extracts field values from tracing events.
struct JsonFieldVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            fields: serde_json::Map::new(),
            message: None,
        }
    }

    fn insert(&mut self, field: &tracing::field::Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.insert(field, serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, serde_json::Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        // NaN and infinities have no JSON number form
        let v = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.insert(field, v);
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, serde_json::Value::Bool(value));
    }
}

struct SpanContextVisitor {
    context: SpanContext,
}

impl tracing::field::Visit for SpanContextVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "run_id" {
            self.context.run_id = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "run_id" {
            self.context.run_id = Some(format!("{:?}", value));
        }
    }
}

/// JSONL tracing layer that outputs to stderr.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a new JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanContextVisitor {
            context: SpanContext::default(),
        };
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut run_id = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if span_ctx.run_id.is_some() {
                        run_id.clone_from(&span_ctx.run_id);
                        break;
                    }
                }
            }
        }

        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut record = LogEvent::new(level, event.metadata().target());
        if let Some(id) = run_id {
            record = record.with_run_id(id);
        }
        if let Some(message) = visitor.message {
            record = record.with_message(message);
        }
        for (key, value) in visitor.fields {
            record = record.with_field(key, value);
        }

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", record.to_jsonl());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_log::capture_events;

    fn capture(f: impl FnOnce()) -> serde_json::Value {
        let ((), mut events) = capture_events(f);
        assert_eq!(events.len(), 1);
        events.remove(0)
    }

    #[test]
    fn layer_writes_event_target_and_stage() {
        let parsed = capture(|| {
            tracing::warn!(target: "fit.cycle_broken", from = "PRES_a", "dropping edge");
        });
        assert_eq!(parsed["level"], "warn");
        assert_eq!(parsed["event"], "fit.cycle_broken");
        assert_eq!(parsed["stage"], "fit");
        assert_eq!(parsed["message"], "dropping edge");
        assert_eq!(parsed["fields"]["from"], "PRES_a");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn layer_records_typed_fields() {
        let parsed = capture(|| {
            tracing::info!(target: "cpt.from_data", rows = 42u64, score = 0.5, exact = true, "ok");
        });
        assert_eq!(parsed["fields"]["rows"], 42);
        assert_eq!(parsed["fields"]["score"], 0.5);
        assert_eq!(parsed["fields"]["exact"], true);
    }

    #[test]
    fn layer_picks_up_run_id_from_span() {
        let parsed = capture(|| {
            let span = tracing::info_span!("run", run_id = "run-abc");
            let _guard = span.enter();
            tracing::info!(target: "run.started", "starting");
        });
        assert_eq!(parsed["run_id"], "run-abc");
    }

    #[test]
    fn layer_omits_absent_run_id() {
        let parsed = capture(|| tracing::info!(target: "run.started", "starting"));
        assert!(parsed.get("run_id").map_or(true, |v| v.is_null()));
    }
}
