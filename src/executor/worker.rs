// progress-reporting worker threads
use super::event::{Envelope, Event, EventChannel, UserData};
use super::panic_handler::{PanicHandler, PanicInfo};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::telemetry::Metrics;
use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static WORKER_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

pub type WorkerId = usize;

type Body = Box<dyn FnOnce(&Worker) + Send + 'static>;
type FinishHook = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Created,
    Running,
    Finished,
}

/// Who is responsible for the worker once its coordinator goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    External,
    CoordinatorOwned,
    /// The coordinator was dropped while the worker ran; it disposes itself on finish.
    Released,
    Disposed,
}

#[derive(Debug, Default)]
struct Progress {
    min: i64,
    max: i64,
    value: i64,
    text: String,
}

#[derive(Default)]
struct Lifecycle {
    state: WorkerState,
    hooks: Vec<FinishHook>,
    settled: bool,
}

struct Inner {
    id: WorkerId,
    canceled: AtomicBool,
    channel: EventChannel,
    progress: Mutex<Progress>,
    body: Mutex<Option<Body>>,
    lifecycle: Mutex<Lifecycle>,
    settled: Condvar,
    thread: Mutex<Option<JoinHandle<()>>>,
    ownership: Mutex<Ownership>,
    failure: Mutex<Option<PanicInfo>>,
}

/// Handle to one independently running unit of work.
///
/// The progress setters (`set_range`, `set_value`, `set_text`) belong to the
/// worker's own body and each publishes exactly one [`Event`]. `cancel` and
/// `is_canceled` may be used from any thread. Cancellation is cooperative:
/// the body has to poll `is_canceled` and return on its own.
///
/// Clones share the same worker.
#[derive(Clone)]
pub struct Worker {
    inner: Arc<Inner>,
}

impl Worker {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&Worker) + Send + 'static,
    {
        let id = WORKER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(Inner {
                id,
                canceled: AtomicBool::new(false),
                channel: EventChannel::new(id),
                progress: Mutex::new(Progress::default()),
                body: Mutex::new(Some(Box::new(f))),
                lifecycle: Mutex::new(Lifecycle::default()),
                settled: Condvar::new(),
                thread: Mutex::new(None),
                ownership: Mutex::new(Ownership::External),
                failure: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.inner.id
    }

    pub fn set_range(&self, min: i64, max: i64) {
        {
            let mut progress = self.inner.progress.lock();
            progress.min = min;
            progress.max = max;
        }
        self.inner.channel.publish(Event::RangeChanged { min, max });
    }

    pub fn set_value(&self, value: i64) {
        self.emit_value(value, None);
    }

    /// Like [`set_value`](Self::set_value), attaching a payload for the sinks.
    pub fn set_value_with<T>(&self, value: i64, data: T)
    where
        T: Any + Send + Sync,
    {
        self.emit_value(value, Some(Arc::new(data)));
    }

    fn emit_value(&self, value: i64, user_data: Option<UserData>) {
        // stamped at emission, not at delivery
        let timestamp = Instant::now();
        self.inner.progress.lock().value = value;
        self.inner.channel.publish(Event::ValueChanged {
            value,
            user_data,
            timestamp,
        });
    }

    pub fn set_text<S: Into<String>>(&self, text: S) {
        let text = text.into();
        self.inner.progress.lock().text.clone_from(&text);
        self.inner.channel.publish(Event::TextChanged(text));
    }

    pub fn cancel(&self) {
        if !self.inner.canceled.swap(true, Ordering::AcqRel) {
            debug!(worker = self.id(), "cancel requested");
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    pub fn range(&self) -> (i64, i64) {
        let progress = self.inner.progress.lock();
        (progress.min, progress.max)
    }

    pub fn value(&self) -> i64 {
        self.inner.progress.lock().value
    }

    pub fn text(&self) -> String {
        self.inner.progress.lock().text.clone()
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lifecycle.lock().state
    }

    pub fn is_started(&self) -> bool {
        self.state() != WorkerState::Created
    }

    pub fn is_finished(&self) -> bool {
        self.state() == WorkerState::Finished
    }

    /// Panic captured from the body, if it did not return normally.
    pub fn failure(&self) -> Option<PanicInfo> {
        self.inner.failure.lock().clone()
    }

    pub fn channel(&self) -> &EventChannel {
        &self.inner.channel
    }

    pub fn subscribe(&self) -> Receiver<Envelope> {
        self.inner.channel.subscribe()
    }

    pub fn ownership(&self) -> Ownership {
        *self.inner.ownership.lock()
    }

    /// Run `hook` once the worker has finished. If it already has, `hook`
    /// runs right away on the calling thread.
    pub fn on_finish<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state == WorkerState::Finished {
            drop(lifecycle);
            hook();
        } else {
            lifecycle.hooks.push(Box::new(hook));
        }
    }

    /// Start the worker on its own thread using the default configuration.
    pub fn start(&self) -> Result<()> {
        self.spawn(&Config::default(), Arc::new(PanicHandler::default()), None)
    }

    pub(crate) fn spawn(
        &self,
        config: &Config,
        handler: Arc<PanicHandler>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<()> {
        let body = self
            .inner
            .body
            .lock()
            .take()
            .ok_or(Error::AlreadyStarted(self.id()))?;

        let name = format!("{}-{}", config.thread_name_prefix, self.id());
        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        self.inner.lifecycle.lock().state = WorkerState::Running;

        let worker = self.clone();
        let spawned = builder.spawn(move || {
            worker.execute(body, &handler, metrics.as_deref());
        });

        match spawned {
            Ok(handle) => {
                *self.inner.thread.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(worker = self.id(), error = %e, "failed to spawn worker thread");
                self.finish();
                Err(Error::spawn(e.to_string()))
            }
        }
    }

    fn execute(self, body: Body, handler: &PanicHandler, metrics: Option<&Metrics>) {
        debug!(worker = self.id(), "worker started");
        if let Some(metrics) = metrics {
            metrics.record_worker_started();
        }

        let start = Instant::now();
        if let Err(info) = handler.guard(self.id(), || body(&self)) {
            if let Some(metrics) = metrics {
                metrics.record_worker_panic();
            }
            *self.inner.failure.lock() = Some(info);
        }

        let elapsed = start.elapsed();
        if let Some(metrics) = metrics {
            metrics.record_worker_finished(elapsed.as_nanos() as u64);
        }
        debug!(
            worker = self.id(),
            canceled = self.is_canceled(),
            elapsed_ms = elapsed.as_millis() as u64,
            "worker finished"
        );

        self.finish();
    }

    fn finish(&self) {
        let hooks = {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.state = WorkerState::Finished;
            std::mem::take(&mut lifecycle.hooks)
        };

        self.inner.channel.publish(Event::Finished);

        for hook in hooks {
            hook();
        }

        let mut lifecycle = self.inner.lifecycle.lock();
        lifecycle.settled = true;
        self.inner.settled.notify_all();
    }

    /// Block until the worker has finished and its finish hooks have run,
    /// or until `timeout` elapses. Returns whether the worker finished.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut lifecycle = self.inner.lifecycle.lock();
        while !lifecycle.settled {
            if self
                .inner
                .settled
                .wait_until(&mut lifecycle, deadline)
                .timed_out()
            {
                return lifecycle.settled;
            }
        }
        true
    }

    /// Join the worker thread. Must not be called from the worker itself.
    /// Returns immediately if the thread was never started or already joined.
    pub fn join(&self) -> Result<()> {
        let handle = self.inner.thread.lock().take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::worker_panic("worker thread terminated abnormally")),
            None => Ok(()),
        }
    }

    pub(crate) fn adopt(&self) {
        *self.inner.ownership.lock() = Ownership::CoordinatorOwned;
    }

    pub(crate) fn release(&self) {
        *self.inner.ownership.lock() = Ownership::Released;
    }

    pub(crate) fn dispose(&self) {
        *self.inner.ownership.lock() = Ownership::Disposed;
        self.inner.channel.clear();
        // detach; the thread is on its way out
        drop(self.inner.thread.lock().take());
        debug!(worker = self.id(), "released worker disposed");
    }
}

impl PartialEq for Worker {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Worker {}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("canceled", &self.is_canceled())
            .field("ownership", &self.ownership())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_ids_are_unique() {
        let a = Worker::new(|_| {});
        let b = Worker::new(|_| {});
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_events_in_emission_order() {
        let worker = Worker::new(|w| {
            w.set_range(0, 10);
            w.set_value(3);
            w.set_value(7);
            w.set_text("done");
        });
        let rx = worker.subscribe();

        worker.start().unwrap();
        assert!(worker.wait(WAIT));

        let events: Vec<Event> = rx.try_iter().map(|e| e.event).collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], Event::RangeChanged { min: 0, max: 10 }));
        assert!(matches!(events[1], Event::ValueChanged { value: 3, .. }));
        assert!(matches!(events[2], Event::ValueChanged { value: 7, .. }));
        assert!(matches!(&events[3], Event::TextChanged(t) if t == "done"));
        assert!(events[4].is_finished());

        assert_eq!(worker.range(), (0, 10));
        assert_eq!(worker.value(), 7);
        assert_eq!(worker.text(), "done");
    }

    #[test]
    fn test_default_range_is_unset() {
        let worker = Worker::new(|_| {});
        assert_eq!(worker.range(), (0, 0));
        assert_eq!(worker.state(), WorkerState::Created);
    }

    #[test]
    fn test_timestamps_taken_at_emission() {
        let worker = Worker::new(|w| {
            w.set_value(1);
            thread::sleep(Duration::from_millis(20));
            w.set_value(2);
        });
        let rx = worker.subscribe();
        worker.start().unwrap();
        assert!(worker.wait(WAIT));

        let stamps: Vec<Instant> = rx
            .try_iter()
            .filter_map(|e| match e.event {
                Event::ValueChanged { timestamp, .. } => Some(timestamp),
                _ => None,
            })
            .collect();
        assert_eq!(stamps.len(), 2);
        assert!(stamps[1] - stamps[0] >= Duration::from_millis(20));
    }

    #[test]
    fn test_cooperative_cancel() {
        let worker = Worker::new(|w| {
            while !w.is_canceled() {
                thread::sleep(Duration::from_millis(1));
            }
        });
        worker.start().unwrap();
        assert!(!worker.wait(Duration::from_millis(20)));

        worker.cancel();
        worker.cancel();
        assert!(worker.wait(WAIT));
        assert!(worker.is_canceled());
        assert!(worker.join().is_ok());
    }

    #[test]
    fn test_double_start_rejected() {
        let worker = Worker::new(|_| {});
        worker.start().unwrap();
        assert!(matches!(worker.start(), Err(Error::AlreadyStarted(id)) if id == worker.id()));
        worker.join().unwrap();
    }

    #[test]
    fn test_panic_still_finishes() {
        let worker = Worker::new(|_| panic!("boom"));
        let rx = worker.subscribe();
        worker.start().unwrap();

        assert!(worker.wait(WAIT));
        assert_eq!(worker.failure().unwrap().message, "boom");
        assert!(rx.try_iter().any(|e| e.event.is_finished()));
    }

    #[test]
    fn test_on_finish_before_and_after() {
        let gate = Arc::new(Barrier::new(2));
        let gate_clone = gate.clone();
        let worker = Worker::new(move |_| {
            gate_clone.wait();
        });
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        worker.on_finish(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        worker.start().unwrap();
        gate.wait();
        assert!(worker.wait(WAIT));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let h = hits.clone();
        worker.on_finish(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
