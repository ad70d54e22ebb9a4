use super::aggregate::ProgressSample;
use crate::executor::Worker;
use crate::sink::Sink;

/// One registered (worker, sink) pair. Only touched from the coordinator's
/// event-handling context.
pub(crate) struct TaskRecord {
    pub(crate) worker: Worker,
    pub(crate) sink: Box<dyn Sink>,
    pub(crate) auto_hide: bool,
    /// Last range and value seen from the worker, for aggregation.
    pub(crate) sample: ProgressSample,
    pub(crate) finished: bool,
}

impl TaskRecord {
    pub(crate) fn new(worker: Worker, sink: Box<dyn Sink>, auto_hide: bool) -> Self {
        Self {
            worker,
            sink,
            auto_hide,
            sample: ProgressSample::default(),
            finished: false,
        }
    }
}

impl std::fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("worker", &self.worker.id())
            .field("auto_hide", &self.auto_hide)
            .field("sample", &self.sample)
            .field("finished", &self.finished)
            .finish()
    }
}
