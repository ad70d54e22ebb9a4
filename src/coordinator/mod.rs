//! Task coordinator - runs workers, aggregates their progress and decides
//! when everything is done.
//!
//! The coordinator is responsible for:
//! - Starting registered workers and routing their events to the paired sink
//! - Overall progress across all tasks
//! - Finish detection and the final outcome
//! - Cooperative cancellation of every worker
//! - Handing still-running owned workers off safely when it is dropped
//!
//! Workers never touch coordinator state. Their events queue up on a channel
//! and are applied when the owner pumps the coordinator with
//! [`process_events`](Coordinator::process_events),
//! [`process_events_timeout`](Coordinator::process_events_timeout) or
//! [`run`](Coordinator::run), all on one thread. Sinks are called from there
//! too, never from a worker thread.

pub mod aggregate;
mod task;

pub use aggregate::{aggregate, OverallProgress, ProgressSample};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{
    Envelope, Event, FunctionWorker, Ownership, PanicHandler, Worker, WorkerId,
};
use crate::sink::Sink;
use crate::telemetry::{Metrics, MetricsSnapshot};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use task::TaskRecord;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Active,
    /// Every task finished but auto-close is off; waiting for [`Coordinator::close`].
    AllFinished,
    Closed(Outcome),
}

/// Coordinator-level view of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Canceling,
    Finished,
}

pub struct Coordinator {
    config: Config,
    tasks: Vec<TaskRecord>,
    index: HashMap<WorkerId, usize>,
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
    overall_enabled: bool,
    overall: Option<OverallProgress>,
    overall_sink: Option<Box<dyn Sink>>,
    auto_close: bool,
    canceled: bool,
    close_requested: bool,
    state: CoordinatorState,
    label: String,
    panic_handler: Arc<PanicHandler>,
    metrics: Option<Arc<Metrics>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        let (tx, rx) = unbounded();

        #[cfg(feature = "telemetry")]
        let metrics = config.enable_telemetry.then(|| Arc::new(Metrics::new()));
        #[cfg(not(feature = "telemetry"))]
        let metrics = None;

        let overall_progress = config.overall_progress;
        let mut coordinator = Self {
            tasks: Vec::new(),
            index: HashMap::new(),
            tx,
            rx,
            overall_enabled: false,
            overall: None,
            overall_sink: None,
            auto_close: config.auto_close,
            canceled: false,
            close_requested: false,
            state: CoordinatorState::Active,
            label: String::new(),
            panic_handler: Arc::new(PanicHandler::new(config.panic_strategy)),
            metrics,
            config,
        };
        coordinator.set_overall_progress(overall_progress);
        coordinator
    }

    /// Register a worker the caller keeps owning and start it.
    ///
    /// Returns the task's index. Fails if the worker was already started or
    /// registered, or once the coordinator is closed.
    pub fn register<S>(&mut self, worker: &Worker, sink: S, auto_hide: bool) -> Result<usize>
    where
        S: Sink + 'static,
    {
        self.add(worker.clone(), Box::new(sink), auto_hide, false)
    }

    /// Like [`register`](Self::register), but the coordinator takes over the
    /// worker's lifetime.
    pub fn adopt<S>(&mut self, worker: Worker, sink: S, auto_hide: bool) -> Result<usize>
    where
        S: Sink + 'static,
    {
        self.add(worker, Box::new(sink), auto_hide, true)
    }

    /// Run `f` on a new coordinator-owned worker and return a handle to its result.
    pub fn spawn<F, R, S>(&mut self, f: F, sink: S) -> Result<FunctionWorker<R>>
    where
        F: FnOnce(&Worker) -> R + Send + 'static,
        R: Send + Sync + 'static,
        S: Sink + 'static,
    {
        let task = FunctionWorker::new(f);
        self.add(task.worker().clone(), Box::new(sink), false, true)?;
        Ok(task)
    }

    fn add(&mut self, worker: Worker, sink: Box<dyn Sink>, auto_hide: bool, owned: bool) -> Result<usize> {
        if let CoordinatorState::Closed(_) = self.state {
            return Err(Error::Closed);
        }
        if worker.is_started() || self.index.contains_key(&worker.id()) {
            return Err(Error::AlreadyStarted(worker.id()));
        }

        // subscribe before the thread exists so no event is missed
        worker.channel().attach(self.tx.clone());
        if owned {
            worker.adopt();
        }
        worker.spawn(&self.config, Arc::clone(&self.panic_handler), self.metrics.clone())?;

        let index = self.tasks.len();
        self.index.insert(worker.id(), index);
        debug!(worker = worker.id(), index, owned, auto_hide, "task registered");
        self.tasks.push(TaskRecord::new(worker, sink, auto_hide));

        if self.state == CoordinatorState::AllFinished {
            self.state = CoordinatorState::Active;
        }
        self.update_overall_progress();

        Ok(index)
    }

    /// Apply every queued event without blocking. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            self.dispatch(envelope);
            processed += 1;
        }
        processed
    }

    /// Wait up to `timeout` for an event, then drain the queue.
    pub fn process_events_timeout(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(envelope) => {
                self.dispatch(envelope);
                1 + self.process_events()
            }
            Err(_) => 0,
        }
    }

    /// Drive the event loop until every task has finished.
    ///
    /// Returns `Closed` when auto-close (or a pending [`close`](Self::close))
    /// finalized the outcome, `AllFinished` otherwise. Returns right away when
    /// nothing is registered. A worker that never returns keeps this blocked.
    pub fn run(&mut self) -> CoordinatorState {
        while self.state == CoordinatorState::Active && !self.tasks.is_empty() {
            match self.rx.recv() {
                Ok(envelope) => self.dispatch(envelope),
                Err(_) => break,
            }
        }
        self.state
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let Some(&index) = self.index.get(&envelope.source) else {
            trace!(worker = envelope.source, "event from unregistered worker ignored");
            return;
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_event_dispatched();
        }

        match envelope.event {
            Event::RangeChanged { min, max } => {
                let sample = &mut self.tasks[index].sample;
                sample.min = min;
                sample.max = max;
                self.update_overall_progress();
                self.tasks[index].sink.on_range_changed(min, max);
            }
            Event::ValueChanged {
                value,
                user_data,
                timestamp,
            } => {
                self.tasks[index].sample.value = value;
                self.update_overall_progress();
                self.tasks[index]
                    .sink
                    .on_value_changed(value, user_data.as_ref(), timestamp);
            }
            Event::TextChanged(text) => self.tasks[index].sink.on_text_changed(&text),
            Event::Finished => self.task_finished(index),
        }
    }

    fn task_finished(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        if task.finished {
            return;
        }
        task.finished = true;
        debug!(worker = task.worker.id(), index, "task finished");

        if task.auto_hide {
            task.sink.on_hide_requested();
        }

        if self.all_finished() {
            info!(tasks = self.tasks.len(), canceled = self.canceled, "all tasks finished");
            if self.auto_close || self.close_requested {
                self.finalize();
            } else {
                self.state = CoordinatorState::AllFinished;
            }
        }
    }

    fn finalize(&mut self) -> Outcome {
        let outcome = if self.canceled {
            Outcome::Rejected
        } else {
            Outcome::Accepted
        };
        self.state = CoordinatorState::Closed(outcome);
        info!(?outcome, "coordinator closed");
        outcome
    }

    fn update_overall_progress(&mut self) {
        if !self.overall_enabled {
            return;
        }

        let overall = aggregate(self.tasks.iter().map(|task| task.sample));
        self.overall = Some(overall);

        if let Some(sink) = self.overall_sink.as_mut() {
            match overall {
                OverallProgress::Indeterminate => sink.on_range_changed(0, 0),
                OverallProgress::Percent(percent) => {
                    sink.on_range_changed(0, 100);
                    sink.on_value_changed(percent, None, Instant::now());
                }
            }
        }
    }

    /// Ask every worker to stop. Does not wait for them.
    pub fn cancel_all(&mut self) {
        if !self.canceled {
            info!(tasks = self.tasks.len(), "canceling all tasks");
        }
        self.canceled = true;

        for task in &self.tasks {
            task.worker.cancel();
            if let Some(metrics) = &self.metrics {
                metrics.record_cancel_signal();
            }
        }
    }

    pub fn request_cancel(&mut self) {
        self.cancel_all();
    }

    /// Finalize now if every task has finished; otherwise cancel everything
    /// and finalize once the last worker is done. Returns the outcome if it
    /// is already decided.
    pub fn close(&mut self) -> Option<Outcome> {
        match self.state {
            CoordinatorState::Closed(outcome) => Some(outcome),
            _ if self.all_finished() => Some(self.finalize()),
            _ => {
                self.close_requested = true;
                self.cancel_all();
                None
            }
        }
    }

    pub fn all_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.finished)
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            CoordinatorState::Closed(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// All tasks are done and the outcome waits for an explicit [`close`](Self::close).
    pub fn is_ready_to_close(&self) -> bool {
        self.state == CoordinatorState::AllFinished
    }

    pub fn set_overall_progress(&mut self, enabled: bool) {
        if self.overall_enabled == enabled {
            return;
        }
        self.overall_enabled = enabled;
        if enabled {
            self.update_overall_progress();
        } else {
            self.overall = None;
        }
    }

    pub fn has_overall_progress(&self) -> bool {
        self.overall_enabled
    }

    /// `None` while overall progress is disabled.
    pub fn overall_progress(&self) -> Option<OverallProgress> {
        self.overall
    }

    /// Sink receiving the overall progress: `(0, 0)` range while
    /// indeterminate, otherwise a `(0, 100)` range followed by the percentage.
    pub fn set_overall_sink<S: Sink + 'static>(&mut self, sink: S) {
        self.overall_sink = Some(Box::new(sink));
        self.update_overall_progress();
    }

    pub fn set_auto_close(&mut self, enabled: bool) {
        self.auto_close = enabled;
    }

    pub fn auto_close(&self) -> bool {
        self.auto_close
    }

    pub fn set_label_text<S: Into<String>>(&mut self, text: S) {
        self.label = text.into();
    }

    pub fn label_text(&self) -> &str {
        &self.label
    }

    pub fn is_label_visible(&self) -> bool {
        !self.label.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn task(&self, index: usize) -> &TaskRecord {
        assert!(
            index < self.tasks.len(),
            "task index {} out of range (task count {})",
            index,
            self.tasks.len()
        );
        &self.tasks[index]
    }

    fn task_mut(&mut self, index: usize) -> &mut TaskRecord {
        assert!(
            index < self.tasks.len(),
            "task index {} out of range (task count {})",
            index,
            self.tasks.len()
        );
        &mut self.tasks[index]
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn worker_at(&self, index: usize) -> &Worker {
        &self.task(index).worker
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn sink_at(&self, index: usize) -> &dyn Sink {
        &*self.task(index).sink
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn sink_at_mut(&mut self, index: usize) -> &mut (dyn Sink + 'static) {
        &mut *self.task_mut(index).sink
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn set_auto_hide(&mut self, index: usize, auto_hide: bool) {
        self.task_mut(index).auto_hide = auto_hide;
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn auto_hide(&self, index: usize) -> bool {
        self.task(index).auto_hide
    }

    /// # Panics
    /// If `index >= task_count()`.
    pub fn task_state(&self, index: usize) -> TaskState {
        let task = self.task(index);
        if task.finished {
            TaskState::Finished
        } else if !task.worker.is_started() {
            TaskState::Created
        } else if self.canceled || task.worker.is_canceled() {
            TaskState::Canceling
        } else {
            TaskState::Running
        }
    }

    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|metrics| metrics.snapshot())
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        for task in &self.tasks {
            let worker = &task.worker;
            if worker.ownership() != Ownership::CoordinatorOwned || worker.is_finished() {
                continue;
            }

            // never join here: hand the worker to itself and let it clean up on exit
            debug!(worker = worker.id(), "releasing running worker");
            worker.release();
            let released = worker.clone();
            worker.on_finish(move || released.dispose());
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("tasks", &self.tasks)
            .field("state", &self.state)
            .field("canceled", &self.canceled)
            .field("auto_close", &self.auto_close)
            .field("overall", &self.overall)
            .finish()
    }
}
