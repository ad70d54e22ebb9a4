//! Telemetry for worker lifecycles and event dispatch.
//!
//! Counts workers started, finished, panicked and canceled, events the
//! coordinator dispatched, and keeps a histogram of worker run times.

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub use metrics::{Metrics, MetricsSnapshot};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone)]
    pub struct Metrics {
        start_time: Instant,
    }

    impl Metrics {
        pub fn new() -> Self {
            Self { start_time: Instant::now() }
        }
        pub fn record_worker_started(&self) {}
        pub fn record_worker_finished(&self, _duration_ns: u64) {}
        pub fn record_worker_panic(&self) {}
        pub fn record_cancel_signal(&self) {}
        pub fn record_event_dispatched(&self) {}

        pub fn snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                timestamp: Instant::now(),
                uptime: self.start_time.elapsed(),
                workers_started: 0,
                workers_finished: 0,
                workers_panicked: 0,
                cancel_signals: 0,
                events_dispatched: 0,
                avg_run_ns: 0,
                p50_run_ns: 0,
                p99_run_ns: 0,
                max_run_ns: 0,
            }
        }
    }

    impl Default for Metrics {
        fn default() -> Self {
            Self::new()
        }
    }

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
        pub fn running(&self) -> u64 {
            self.workers_started.saturating_sub(self.workers_finished)
        }

        pub fn finished_per_second(&self) -> f64 {
            0.0
        }
    }

}

#[cfg(not(feature = "telemetry"))]
pub use metrics::{Metrics, MetricsSnapshot};
