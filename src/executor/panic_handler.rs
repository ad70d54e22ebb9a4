use super::worker::WorkerId;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, warn};

/// What happens after a worker body panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Log and abort the process.
    Abort,
    /// Capture silently.
    Isolate,
    /// Capture and log a warning.
    #[default]
    LogAndContinue,
}

/// Guards worker bodies so a panic ends the body but never skips the
/// worker's `Finished` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicHandler {
    strategy: PanicStrategy,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self { strategy }
    }

    /// Run the body of `worker`, turning a panic into a [`PanicInfo`].
    pub fn guard<F, R>(&self, worker: WorkerId, body: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        let payload = match catch_unwind(AssertUnwindSafe(body)) {
            Ok(value) => return Ok(value),
            Err(payload) => payload,
        };
        let info = PanicInfo::from(payload);

        match self.strategy {
            PanicStrategy::Abort => {
                error!(worker, message = %info, "worker body panicked, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => warn!(worker, message = %info, "worker body panicked"),
        }
        Err(info)
    }
}

/// Message of a captured worker panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl From<Box<dyn Any + Send>> for PanicInfo {
    fn from(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map_or_else(|| "Unknown panic".to_string(), |s| s.to_string()),
        };
        Self { message }
    }
}

impl std::fmt::Display for PanicInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
