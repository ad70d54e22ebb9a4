//! Workers that run a closure and keep what it returned.

use super::panic_handler::PanicInfo;
use super::worker::Worker;
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;

struct ResultSlot<R> {
    value: RwLock<Option<R>>,
}

impl<R> ResultSlot<R> {
    fn store(&self, value: R) {
        let mut slot = self.value.write();
        debug_assert!(slot.is_none(), "result stored twice");
        *slot = Some(value);
    }
}

/// A [`Worker`] whose body is `f(&Worker) -> R`.
///
/// The return value is stored exactly once, before the worker emits
/// `Finished`, and never changes afterwards. Readers on any thread see either
/// no result or the complete one. If `f` panics the result stays absent for
/// good and the panic is available from [`failure`](Self::failure).
///
/// For `R = ()` the slot only records that the closure returned.
pub struct FunctionWorker<R> {
    worker: Worker,
    slot: Arc<ResultSlot<R>>,
}

impl<R> FunctionWorker<R>
where
    R: Send + Sync + 'static,
{
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&Worker) -> R + Send + 'static,
    {
        let slot = Arc::new(ResultSlot {
            value: RwLock::new(None),
        });
        let writer = Arc::clone(&slot);
        let worker = Worker::new(move |worker| {
            let result = f(worker);
            writer.store(result);
        });

        Self { worker, slot }
    }

    pub fn result(&self) -> Option<R>
    where
        R: Clone,
    {
        self.slot.value.read().clone()
    }

    /// Borrow the result without cloning it.
    pub fn with_result<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.slot.value.read().as_ref().map(f)
    }

    pub fn has_result(&self) -> bool {
        self.slot.value.read().is_some()
    }

    pub fn failure(&self) -> Option<PanicInfo> {
        self.worker.failure()
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    pub fn into_worker(self) -> Worker {
        self.worker
    }
}

impl<R> Deref for FunctionWorker<R> {
    type Target = Worker;

    fn deref(&self) -> &Worker {
        &self.worker
    }
}

impl<R> Clone for FunctionWorker<R> {
    fn clone(&self) -> Self {
        Self {
            worker: self.worker.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> std::fmt::Debug for FunctionWorker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionWorker")
            .field("worker", &self.worker)
            .field("has_result", &self.slot.value.read().is_some())
            .finish()
    }
}
