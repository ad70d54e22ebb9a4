//! Worker execution infrastructure.
//!
//! This module provides the progress-reporting [`Worker`], the
//! result-bearing [`FunctionWorker`], the per-worker [`EventChannel`] and
//! the panic isolation used around worker bodies.

pub mod event;
pub mod function;
pub mod panic_handler;
pub mod worker;

pub use event::{user_data_as_f64, Envelope, Event, EventChannel, TimeStamp, UserData};
pub use function::FunctionWorker;
pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use worker::{Ownership, Worker, WorkerId, WorkerState};
