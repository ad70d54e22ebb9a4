//! Metrics collection for worker monitoring.

use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Worker and dispatch metrics collector
#[derive(Debug)]
pub struct Metrics {
    // Worker counters
    workers_started: AtomicU64,
    workers_finished: AtomicU64,
    workers_panicked: AtomicU64,
    cancel_signals: AtomicU64,

    events_dispatched: AtomicU64,

    // Run time of worker bodies, nanoseconds
    run_time_histogram: RwLock<Histogram<u64>>,

    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        // 3 significant figures, max value of 1 day in nanoseconds
        let histogram = Histogram::new_with_max(86_400_000_000_000, 3)
            .expect("Failed to create histogram");

        Self {
            workers_started: AtomicU64::new(0),
            workers_finished: AtomicU64::new(0),
            workers_panicked: AtomicU64::new(0),
            cancel_signals: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            run_time_histogram: RwLock::new(histogram),
            start_time: Instant::now(),
        }
    }

    pub fn record_worker_started(&self) {
        self.workers_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished worker with the run time of its body
    pub fn record_worker_finished(&self, duration_ns: u64) {
        self.workers_finished.fetch_add(1, Ordering::Relaxed);
        self.run_time_histogram.write().saturating_record(duration_ns);
    }

    pub fn record_worker_panic(&self) {
        self.workers_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancel_signal(&self) {
        self.cancel_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let histogram = self.run_time_histogram.read();

        MetricsSnapshot {
            timestamp: Instant::now(),
            uptime: self.start_time.elapsed(),
            workers_started: self.workers_started.load(Ordering::Relaxed),
            workers_finished: self.workers_finished.load(Ordering::Relaxed),
            workers_panicked: self.workers_panicked.load(Ordering::Relaxed),
            cancel_signals: self.cancel_signals.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            avg_run_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_run_ns: histogram.value_at_quantile(0.50),
            p99_run_ns: histogram.value_at_quantile(0.99),
            max_run_ns: histogram.max(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: Instant,
    pub uptime: Duration,
    pub workers_started: u64,
    pub workers_finished: u64,
    pub workers_panicked: u64,
    pub cancel_signals: u64,
    pub events_dispatched: u64,
    pub avg_run_ns: u64,
    pub p50_run_ns: u64,
    pub p99_run_ns: u64,
    pub max_run_ns: u64,
}

impl MetricsSnapshot {
    /// Workers started but not yet finished
    pub fn running(&self) -> u64 {
        self.workers_started.saturating_sub(self.workers_finished)
    }

    pub fn finished_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.workers_finished as f64 / seconds
    }
}
