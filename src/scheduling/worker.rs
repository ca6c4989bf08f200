use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};

use super::{WorkerErr, WorkerMetrics, WorkerReport};

/// A unit of work handed to a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            WorkerState::Created => "created",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        };

        f.write_str(state)
    }
}

struct Slot {
    state: WorkerState,
    pending: Option<Job>,
    busy: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
    metrics: Mutex<WorkerMetrics>,
}

impl Shared {
    /// Blocks until there's a job to run, or returns `None` once stopping.
    fn next_job(&self) -> Option<Job> {
        let mut slot = self.slot.lock();

        loop {
            if let Some(job) = slot.pending.take() {
                slot.busy = true;
                return Some(job);
            }

            if slot.state == WorkerState::Stopping {
                return None;
            }

            self.ready.wait(&mut slot);
        }
    }
}

/// A single OS thread that executes at most one job at a time.
///
/// The fatigue factor is fixed at creation and only ranks the worker among
/// the idle ones, it never changes what the worker computes.
pub struct Worker {
    id: usize,
    fatigue: f64,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Creates a new `Worker`, the thread isn't spawned until `start`.
    ///
    /// # Arguments
    /// * `id` - Identifier used for scheduling ties and observability.
    /// * `fatigue` - The fixed fatigue factor.
    pub fn new(id: usize, fatigue: f64) -> Self {
        Self {
            id,
            fatigue,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: WorkerState::Created,
                    pending: None,
                    busy: false,
                }),
                ready: Condvar::new(),
                metrics: Mutex::new(WorkerMetrics::default()),
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn fatigue(&self) -> f64 {
        self.fatigue
    }

    pub fn state(&self) -> WorkerState {
        self.shared.slot.lock().state
    }

    /// Whether the worker is currently executing a job.
    pub fn is_busy(&self) -> bool {
        self.shared.slot.lock().busy
    }

    /// Spawns the worker's thread.
    ///
    /// # Returns
    /// An error if the worker was already started or the thread couldn't be spawned.
    pub fn start(&self) -> Result<(), WorkerErr> {
        let mut slot = self.shared.slot.lock();
        if slot.state != WorkerState::Created {
            return Err(WorkerErr::InvalidState {
                id: self.id,
                state: slot.state,
            });
        }

        let id = self.id;
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || work(id, &shared))
            .map_err(|source| WorkerErr::Spawn { id, source })?;

        slot.state = WorkerState::Running;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Hands `job` to the worker's thread without waiting for it to run.
    ///
    /// # Arguments
    /// * `job` - The job to execute.
    ///
    /// # Returns
    /// An error if the worker isn't running or still holds a job it hasn't picked up.
    pub fn assign(&self, job: Job) -> Result<(), WorkerErr> {
        let mut slot = self.shared.slot.lock();

        if slot.state != WorkerState::Running {
            return Err(WorkerErr::InvalidState {
                id: self.id,
                state: slot.state,
            });
        }

        if slot.pending.is_some() {
            return Err(WorkerErr::Occupied { id: self.id });
        }

        slot.pending = Some(job);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Makes the thread exit once its current job, if any, is done.
    ///
    /// No job is accepted afterwards.
    pub fn request_stop(&self) {
        let mut slot = self.shared.slot.lock();

        slot.state = match slot.state {
            WorkerState::Created => WorkerState::Stopped,
            WorkerState::Running => WorkerState::Stopping,
            state => state,
        };

        self.shared.ready.notify_one();
    }

    /// Blocks until the worker's thread has exited.
    ///
    /// # Returns
    /// An error if the thread died from a panic outside of a job.
    pub fn await_termination(&self) -> Result<(), WorkerErr> {
        let Some(handle) = self.handle.lock().take() else {
            return Ok(());
        };

        handle
            .join()
            .map_err(|_| WorkerErr::Panicked { id: self.id })
    }

    /// Returns a copy of the worker's cumulative metrics.
    pub fn metrics(&self) -> WorkerMetrics {
        self.shared.metrics.lock().clone()
    }

    /// Returns a point-in-time snapshot of the worker.
    pub fn report(&self) -> WorkerReport {
        let WorkerMetrics { busy, idle, tasks } = self.metrics();

        WorkerReport {
            id: self.id,
            fatigue: self.fatigue,
            busy,
            idle,
            tasks,
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("fatigue", &self.fatigue)
            .field("state", &self.state())
            .finish()
    }
}

/// The body of a worker thread.
fn work(id: usize, shared: &Shared) {
    let mut idle_since = Instant::now();

    while let Some(job) = shared.next_job() {
        let started = Instant::now();
        shared.metrics.lock().add_idle(started - idle_since);
        trace!(worker_id = id; "running job");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            warn!(worker_id = id; "job panicked: {}", panic_message(payload.as_ref()));
        }

        let finished = Instant::now();
        shared.metrics.lock().add_busy(finished - started);
        shared.slot.lock().busy = false;
        idle_since = finished;
        trace!(worker_id = id; "idle");
    }

    shared.metrics.lock().add_idle(idle_since.elapsed());
    shared.slot.lock().state = WorkerState::Stopped;
    trace!(worker_id = id; "stopped");
}

/// Extracts the message out of a panic payload.
pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn explode() {
        panic!("boom");
    }

    fn started(id: usize) -> Worker {
        let worker = Worker::new(id, 1.);
        worker.start().unwrap();
        worker
    }

    #[test]
    fn runs_assigned_job() {
        let worker = started(0);
        let (tx, rx) = mpsc::channel();

        worker
            .assign(Box::new(move || {
                tx.send(thread::current().name().map(String::from)).unwrap();
            }))
            .unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some("worker-0"));

        worker.request_stop();
        worker.await_termination().unwrap();
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert_eq!(worker.metrics().tasks, 1);
    }

    #[test]
    fn rejects_before_start_and_after_stop() {
        let worker = Worker::new(1, 1.);
        assert!(matches!(
            worker.assign(Box::new(|| {})),
            Err(WorkerErr::InvalidState {
                state: WorkerState::Created,
                ..
            })
        ));

        worker.start().unwrap();
        assert!(worker.start().is_err());

        worker.request_stop();
        assert!(worker.assign(Box::new(|| {})).is_err());
        worker.await_termination().unwrap();
    }

    #[test]
    fn holds_at_most_one_undelivered_job() {
        let worker = started(2);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        worker
            .assign(Box::new(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            }))
            .unwrap();
        started_rx.recv().unwrap();
        assert!(worker.is_busy());

        worker.assign(Box::new(|| {})).unwrap();
        assert!(matches!(
            worker.assign(Box::new(|| {})),
            Err(WorkerErr::Occupied { id: 2 })
        ));

        release_tx.send(()).unwrap();
        worker.request_stop();
        worker.await_termination().unwrap();
        assert_eq!(worker.metrics().tasks, 2);
    }

    #[test]
    fn survives_panicking_job() {
        let worker = started(3);
        let (tx, rx) = mpsc::channel();

        worker.assign(Box::new(explode)).unwrap();
        while worker.metrics().tasks == 0 {
            thread::yield_now();
        }

        worker.assign(Box::new(move || tx.send(7).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 7);

        worker.request_stop();
        worker.await_termination().unwrap();
    }

    #[test]
    fn stop_before_start() {
        let worker = Worker::new(4, 1.);
        worker.request_stop();

        assert_eq!(worker.state(), WorkerState::Stopped);
        worker.await_termination().unwrap();
    }

    #[test]
    fn panic_messages() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42), "unknown panic payload");
    }
}
