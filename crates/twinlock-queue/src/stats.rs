use metrics::{counter, Counter};
use serde::Serialize;

use crate::config::QueueConfig;
use crate::sync::{AtomicU64, Ordering};

/// Point-in-time snapshot of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pushed: u64,
    pub popped: u64,
    /// Times a blocking pop parked on the condition variable.
    pub parked: u64,
}

impl QueueStats {
    /// Values pushed but not yet popped when the snapshot was taken.
    pub fn in_flight(&self) -> u64 {
        self.pushed.saturating_sub(self.popped)
    }
}

pub(crate) struct Counters {
    pushed: AtomicU64,
    popped: AtomicU64,
    parked: AtomicU64,
    sink: MetricsSink,
}

impl Counters {
    pub(crate) fn new(config: &QueueConfig) -> Self {
        Self {
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
            parked: AtomicU64::new(0),
            sink: MetricsSink::new(config),
        }
    }

    #[inline]
    pub(crate) fn record_push(&self) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.sink.pushed.increment(1);
    }

    #[inline]
    pub(crate) fn record_pop(&self) {
        self.popped.fetch_add(1, Ordering::Relaxed);
        self.sink.popped.increment(1);
    }

    pub(crate) fn record_park(&self) {
        self.parked.fetch_add(1, Ordering::Relaxed);
        self.sink.parked.increment(1);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            parked: self.parked.load(Ordering::Relaxed),
        }
    }
}

// Handles are resolved once so the hot path never touches the recorder registry.
struct MetricsSink {
    pushed: Counter,
    popped: Counter,
    parked: Counter,
}

impl MetricsSink {
    fn new(config: &QueueConfig) -> Self {
        if !config.metrics {
            return Self {
                pushed: Counter::noop(),
                popped: Counter::noop(),
                parked: Counter::noop(),
            };
        }
        Self {
            pushed: counter!("twinlock_queue_pushed_total", "queue" => config.label.clone()),
            popped: counter!("twinlock_queue_popped_total", "queue" => config.label.clone()),
            parked: counter!("twinlock_queue_parked_total", "queue" => config.label.clone()),
        }
    }
}
