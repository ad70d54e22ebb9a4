//! Simulated multi-file copy driven by a progress coordinator

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use veda_progress::prelude::*;

const CHUNK: i64 = 64 * 1024;

fn main() -> veda_progress::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("veda_progress=info,warn"))
        .with_target(false)
        .init();

    println!("=== Copy Files Demo ===\n");

    let config = Config::builder()
        .thread_name_prefix("copy")
        .overall_progress(true)
        .build()?;
    let mut coordinator = Coordinator::with_config(config)?;
    coordinator.set_label_text("Copying 3 files");
    coordinator.set_overall_sink(TracingSink::new("overall"));

    let mut trackers = Vec::new();
    let mut estimates = Vec::new();

    for (name, size) in [("alpha.bin", 4 * 1024 * 1024), ("beta.bin", 2 * 1024 * 1024), ("gamma.bin", 6 * 1024 * 1024)] {
        let velocity = Arc::new(Mutex::new(VelocityTracker::with_units("B")));
        let estimate = Arc::new(Mutex::new(ProgressEstimate::new()));
        let sinks = SinkGroup::new()
            .with(TracingSink::new(name))
            .with(velocity.clone())
            .with(estimate.clone());

        coordinator.spawn(move |w| copy_file(w, name, size), sinks)?;
        trackers.push((name, velocity));
        estimates.push(estimate);
    }

    let state = coordinator.run();
    println!("\nFinished: {:?}", state);

    for ((name, velocity), estimate) in trackers.iter().zip(&estimates) {
        let velocity = velocity.lock();
        let estimate = estimate.lock();
        println!(
            "  {:<10} peak {:>12.0} B/s  elapsed {}",
            name,
            velocity.max_velocity(),
            estimate.elapsed_text().unwrap_or_default()
        );
    }

    #[cfg(feature = "telemetry")]
    if let Some(metrics) = coordinator.metrics() {
        println!(
            "\nWorkers: {} finished, {} events dispatched",
            metrics.workers_finished, metrics.events_dispatched
        );
    }

    Ok(())
}

fn copy_file(w: &Worker, name: &str, size: i64) -> i64 {
    w.set_text(format!("copying {}", name));
    w.set_range(0, size);

    let mut copied = 0;
    while copied < size && !w.is_canceled() {
        thread::sleep(Duration::from_millis(2));
        let chunk = CHUNK.min(size - copied);
        copied += chunk;
        w.set_value_with(copied, chunk as f64);
    }

    w.set_text(format!("{} done", name));
    copied
}
