//! Progress reporting
//!
//! The pipeline pushes progress to a [`ProgressObserver`] instead of a
//! process-wide UI handle. Observers are called synchronously on the thread
//! doing the work (the extraction loop runs on tokio's blocking pool), so
//! implementations must be cheap and `Send + Sync`. A panic inside an
//! observer is caught and logged; it never aborts the pipeline.
//!
//! Three implementations ship with the crate:
//! - [`NoOpObserver`] discards everything (the default)
//! - [`TracingObserver`] logs through `tracing`
//! - [`ChannelObserver`] forwards [`Event`]s to a `tokio::sync::broadcast`
//!   channel for UIs that want to subscribe

use crate::types::Event;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Receiver of progress updates and status messages
///
/// # Example
///
/// ```
/// use snapshot_bootstrap::ProgressObserver;
///
/// struct Stdout;
///
/// impl ProgressObserver for Stdout {
///     fn on_progress(&self, label: &str, percent: f32) {
///         println!("{label}: {percent:.2}%");
///     }
///
///     fn on_message(&self, message: &str) {
///         println!("{message}");
///     }
/// }
/// ```
pub trait ProgressObserver: Send + Sync {
    /// A labelled percentage (0.0 to 100.0)
    fn on_progress(&self, label: &str, percent: f32);

    /// A human-readable status line (e.g. "File extracted: blocks/blk0.dat")
    fn on_message(&self, message: &str);
}

/// Observer that ignores every notification
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpObserver;

impl ProgressObserver for NoOpObserver {
    fn on_progress(&self, _label: &str, _percent: f32) {}

    fn on_message(&self, _message: &str) {}
}

/// Observer that writes notifications to the `tracing` log
///
/// Progress is logged only when the whole-number percentage changes, so a
/// transfer with thousands of chunks produces at most ~100 lines.
#[derive(Debug)]
pub struct TracingObserver {
    last_logged: AtomicI32,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new() -> Self {
        Self {
            last_logged: AtomicI32::new(-1),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, label: &str, percent: f32) {
        let whole = percent.floor() as i32;
        if self.last_logged.swap(whole, Ordering::Relaxed) != whole {
            debug!(label, percent = format_args!("{percent:.2}"), "progress");
        }
    }

    fn on_message(&self, message: &str) {
        info!("{}", message);
    }
}

/// Observer that forwards notifications as [`Event`]s on a broadcast channel
///
/// Sending never blocks and a channel without subscribers is not an error,
/// so a missing UI cannot stall or fail the pipeline.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    event_tx: broadcast::Sender<Event>,
}

impl ChannelObserver {
    /// Create an observer with its own channel of the given capacity
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self { event_tx }
    }

    /// Wrap an existing sender
    pub fn from_sender(event_tx: broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }

    /// Subscribe to forwarded events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, label: &str, percent: f32) {
        self.event_tx
            .send(Event::Progress {
                label: label.to_string(),
                percent,
            })
            .ok();
    }

    fn on_message(&self, message: &str) {
        self.event_tx
            .send(Event::Message {
                message: message.to_string(),
            })
            .ok();
    }
}

/// Shared handle to the default no-op observer
pub fn noop() -> Arc<dyn ProgressObserver> {
    Arc::new(NoOpObserver)
}

/// Forward a progress update, swallowing a panic from the observer
pub(crate) fn report_progress(observer: &dyn ProgressObserver, label: &str, percent: f32) {
    if catch_unwind(AssertUnwindSafe(|| observer.on_progress(label, percent))).is_err() {
        warn!(label, percent, "progress observer panicked, update dropped");
    }
}

/// Forward a status message, swallowing a panic from the observer
pub(crate) fn report_message(observer: &dyn ProgressObserver, message: &str) {
    if catch_unwind(AssertUnwindSafe(|| observer.on_message(message))).is_err() {
        warn!(status = message, "progress observer panicked, message dropped");
    }
}
