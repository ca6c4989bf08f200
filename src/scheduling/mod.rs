mod error;
mod fatigue;
mod metrics;
mod scheduler;
mod worker;

pub use error::{Result, SchedulerErr, TaskFailure, WorkerErr};
pub use fatigue::{FATIGUE_RANGE, FatigueGen, RandFatigue};
pub use metrics::{WorkerMetrics, WorkerReport};
pub use scheduler::{Scheduler, Task};
pub use worker::{Job, Worker, WorkerState};
