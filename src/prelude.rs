pub use crate::config::{Config, ConfigBuilder};
pub use crate::coordinator::{Coordinator, CoordinatorState, OverallProgress, Outcome, TaskState};
pub use crate::error::{Error, Result};
pub use crate::executor::{Event, FunctionWorker, Ownership, PanicStrategy, Worker, WorkerState};
pub use crate::sink::{
    NullSink, ProgressEstimate, Sink, SinkGroup, TextLog, TracingSink, VelocityTracker,
};

#[cfg(feature = "telemetry")]
pub use crate::telemetry::{Metrics, MetricsSnapshot};
