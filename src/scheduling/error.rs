use std::{error::Error, fmt, io};

use super::WorkerState;

/// The scheduling module's result type.
pub type Result<T> = std::result::Result<T, SchedulerErr>;

/// Failures of a single worker thread.
#[derive(Debug)]
pub enum WorkerErr {
    InvalidState { id: usize, state: WorkerState },
    Occupied { id: usize },
    Spawn { id: usize, source: io::Error },
    Panicked { id: usize },
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::InvalidState { id, state } => write!(f, "worker {id} is {state}"),
            WorkerErr::Occupied { id } => {
                write!(f, "worker {id} already holds an undelivered task")
            }
            WorkerErr::Spawn { id, source } => {
                write!(f, "failed to spawn worker {id}: {source}")
            }
            WorkerErr::Panicked { id } => write!(f, "worker {id} thread panicked"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A task body that returned an error or panicked.
#[derive(Debug)]
pub struct TaskFailure {
    pub worker_id: usize,
    pub error: anyhow::Error,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task on worker {} failed: {:#}", self.worker_id, self.error)
    }
}

/// Scheduler failures.
#[derive(Debug)]
pub enum SchedulerErr {
    /// A scheduler needs at least one worker.
    NoWorkers,
    /// The scheduler was shut down before or while the caller was waiting on it.
    Closed,
    /// The chosen worker refused the task, the bookkeeping was rolled back.
    Dispatch(WorkerErr),
    /// Every task failure observed by the time the in-flight work drained.
    TaskFailures(Vec<TaskFailure>),
    /// A worker couldn't be started or terminated cleanly.
    Worker(WorkerErr),
}

impl fmt::Display for SchedulerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerErr::NoWorkers => f.write_str("number of workers must be positive"),
            SchedulerErr::Closed => f.write_str("scheduler is shut down"),
            SchedulerErr::Dispatch(e) => write!(f, "dispatch failed: {e}"),
            SchedulerErr::TaskFailures(failures) => {
                write!(f, "{} task(s) failed", failures.len())?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
            SchedulerErr::Worker(e) => write!(f, "worker failure: {e}"),
        }
    }
}

impl Error for SchedulerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchedulerErr::Dispatch(e) | SchedulerErr::Worker(e) => Some(e),
            _ => None,
        }
    }
}
