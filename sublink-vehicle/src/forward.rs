//! Forwarding the vehicle's own log events to the logging link
//!
//! [`ForwardLayer`] is installed in the tracing registry next to the
//! formatters. It renders each event at or above the negotiated level into
//! one line and queues it for the logging server.

use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Records held while no station is polling
pub const QUEUE_CAPACITY: usize = 1024;

/// Target prefix whose events are never forwarded
///
/// The logging server's own events would otherwise feed every batch back
/// into the next one.
const SELF_TARGET: &str = "sublink_vehicle::servers::logging";

/// Build the layer and the handle the logging server reads from
pub fn forward_layer() -> (ForwardLayer, LogForwarder) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let level = Arc::new(AtomicU8::new(0));

    let layer = ForwardLayer {
        level: level.clone(),
        tx,
    };
    let forwarder = LogForwarder {
        level,
        queue: Arc::new(Mutex::new(rx)),
    };
    (layer, forwarder)
}

/// Most verbose level forwarded for a negotiated logging level
pub fn level_filter(level: u8) -> Option<Level> {
    match level {
        0 => None,
        1 => Some(Level::INFO),
        _ => Some(Level::DEBUG),
    }
}

pub struct ForwardLayer {
    level: Arc<AtomicU8>,
    tx: mpsc::Sender<String>,
}

impl<S: Subscriber> Layer<S> for ForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(max) = level_filter(self.level.load(Ordering::Relaxed)) else {
            return;
        };

        let meta = event.metadata();
        if *meta.level() > max || meta.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut line = LineVisitor::default();
        event.record(&mut line);
        let record = format!("{} {}: {}{}", meta.level(), meta.target(), line.message, line.fields);

        // Full queue: the station is not polling, drop the record
        let _ = self.tx.try_send(sanitize(&record));
    }
}

/// Braces delimit records on the wire
fn sanitize(record: &str) -> String {
    record.replace('{', "(").replace('}', ")")
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Handle to the forwarded records and the active level
#[derive(Clone)]
pub struct LogForwarder {
    level: Arc<AtomicU8>,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LogForwarder {
    /// 0 stops forwarding, 1 forwards INFO and above, 2 adds DEBUG
    pub fn set_level(&self, level: u8) {
        self.level.store(level, Ordering::Relaxed);
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    /// Wait for at least one record, then take up to `max` queued records
    ///
    /// Returns an empty batch only when the layer is gone.
    pub async fn next_batch(&self, max: usize) -> Vec<String> {
        let mut queue = self.queue.lock().await;
        let mut batch = Vec::new();

        match queue.recv().await {
            Some(record) => batch.push(record),
            None => return batch,
        }
        while batch.len() < max {
            match queue.try_recv() {
                Ok(record) => batch.push(record),
                Err(_) => break,
            }
        }
        batch
    }
}
