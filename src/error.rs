use crate::executor::WorkerId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),

    #[error("worker {0} has already been started")]
    AlreadyStarted(WorkerId),

    #[error("coordinator is closed")]
    Closed,

    #[error("worker panic: {0}")]
    WorkerPanic(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::Spawn(msg.into())
    }

    pub fn worker_panic<S: Into<String>>(msg: S) -> Self {
        Error::WorkerPanic(msg.into())
    }
}
