//! VEDA Progress - coordinated worker threads with aggregated progress
//!
//! Runs any number of independently paced worker threads, each reporting a
//! range, a value and a status text, while a single coordinator folds their
//! progress into one overall figure, detects when everything is done and
//! cancels cooperatively on request.
//!
//! # Quick Start
//!
//! ```no_run
//! use veda_progress::prelude::*;
//!
//! let mut coordinator = Coordinator::new();
//! coordinator.set_overall_progress(true);
//!
//! let task = coordinator
//!     .spawn(
//!         |worker| {
//!             worker.set_range(0, 10);
//!             for i in 0..10 {
//!                 if worker.is_canceled() {
//!                     return None;
//!                 }
//!                 worker.set_value(i + 1);
//!             }
//!             Some(42)
//!         },
//!         TracingSink::new("answer"),
//!     )
//!     .unwrap();
//!
//! let state = coordinator.run();
//! assert_eq!(state, CoordinatorState::Closed(Outcome::Accepted));
//! assert_eq!(task.result(), Some(Some(42)));
//! ```
//!
//! # Features
//!
//! - **Cooperative Cancellation**: one monotonic flag per worker, polled by the worker
//! - **Ordered Events**: each worker's events reach every subscriber in emission order
//! - **Overall Progress**: equal-weight mean of per-task percentages
//! - **Result-Bearing Workers**: typed results readable from any thread
//! - **Safe Teardown**: dropping the coordinator never waits on a running worker
//! - **Telemetry**: worker and dispatch metrics (optional)

#![warn(missing_debug_implementations)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod sink;
pub mod telemetry;

pub use config::{Config, ConfigBuilder};
pub use coordinator::{Coordinator, CoordinatorState, OverallProgress, Outcome, TaskState};
pub use error::{Error, Result};
pub use executor::{Event, FunctionWorker, Worker, WorkerId};
pub use sink::Sink;
