//! Test capture of structured log events.
//!
//! Runs a closure under a [`JsonlLayer`] writing to memory and returns the
//! parsed JSONL records next to the closure's result.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;

use crate::logging::JsonlLayer;

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with JSONL capture installed for the current thread.
pub fn capture_events<T>(f: impl FnOnce() -> T) -> (T, Vec<Value>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber =
        tracing_subscriber::registry().with(JsonlLayer::new(SharedBuffer(buffer.clone())));
    let out = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.lock().unwrap();
    let events = String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    (out, events)
}

/// Names of the captured events, in emission order.
pub fn event_names_of(events: &[Value]) -> Vec<&str> {
    events.iter().filter_map(|e| e["event"].as_str()).collect()
}
