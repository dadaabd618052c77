//! Progress-event broadcast relay.
//!
//! A single intake point fans [`ProgressEvent`]s out to any number of
//! observers. Delivery is at-most-once per observer with no replay: a late
//! subscriber misses prior events. Each subscriber has a bounded queue; a
//! subscriber that falls too far behind sees `Lagged` and loses the oldest
//! events rather than blocking the pipeline. Dropping a receiver is the only
//! way an observer leaves the set.

use tokio::sync::broadcast;

use prospector_shared::{BatchSummary, ProgressEvent, Stage};

/// Default per-subscriber queue capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Single-writer, multi-reader progress relay.
///
/// Cheap to clone; all clones feed the same observers.
#[derive(Clone)]
pub struct ProgressHub {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressHub {
    /// Create a hub with the default per-subscriber capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a hub with the given per-subscriber queue capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new observer. Starts receiving from the next event.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current observers. No-op without observers.
    pub fn publish(&self, event: ProgressEvent) {
        // Send only fails when there are no receivers; that is fine.
        let _ = self.tx.send(event);
    }

    /// Emit one progress tick.
    pub fn progress(&self, current: usize, total: usize, stage: Stage) {
        let percentage = if total == 0 {
            100
        } else {
            (current * 100 / total) as u8
        };
        self.publish(ProgressEvent::Progress {
            percentage,
            current,
            total,
            stage,
        });
    }

    /// Emit a free-form status line.
    pub fn log(&self, message: impl Into<String>) {
        self.publish(ProgressEvent::Log {
            message: message.into(),
        });
    }

    /// Emit the terminal completion event for a run.
    pub fn complete(&self, summary: BatchSummary) {
        self.publish(ProgressEvent::Complete { summary });
    }

    /// Emit a fatal run-level error.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(ProgressEvent::Error {
            message: message.into(),
        });
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_subscribe_roundtrip() {
        let hub = ProgressHub::new();
        let mut rx = hub.subscribe();

        hub.log("arrancando");

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ProgressEvent::Log {
                message: "arrancando".into()
            }
        );
    }

    #[tokio::test]
    async fn publish_without_observers_is_noop() {
        let hub = ProgressHub::new();
        // Should not panic or block.
        hub.progress(1, 10, Stage::Phones);
    }

    #[tokio::test]
    async fn every_observer_sees_every_event() {
        let hub = ProgressHub::new();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.progress(2, 4, Stage::Collection);

        let expected = ProgressEvent::Progress {
            percentage: 50,
            current: 2,
            total: 4,
            stage: Stage::Collection,
        };
        assert_eq!(rx1.recv().await.unwrap(), expected);
        assert_eq!(rx2.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn late_subscriber_misses_prior_events() {
        let hub = ProgressHub::new();
        hub.log("perdido");

        let mut rx = hub.subscribe();
        hub.log("visto");

        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Log {
                message: "visto".into()
            }
        );
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_events() {
        let hub = ProgressHub::with_capacity(2);
        let mut rx = hub.subscribe();

        hub.log("uno");
        hub.log("dos");
        hub.log("tres");

        // Queue capacity 2: "uno" was dropped, the receiver learns it lagged.
        assert!(matches!(
            rx.recv().await,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Log {
                message: "dos".into()
            }
        );
    }

    #[tokio::test]
    async fn dropped_receiver_leaves_the_observer_set() {
        let hub = ProgressHub::new();
        let rx = hub.subscribe();
        assert_eq!(hub.observer_count(), 1);

        drop(rx);
        assert_eq!(hub.observer_count(), 0);
    }
}
