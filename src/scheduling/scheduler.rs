use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use anyhow::anyhow;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{
    FatigueGen, Job, RandFatigue, Result, SchedulerErr, TaskFailure, Worker, WorkerReport,
    worker::panic_message,
};

/// A unit of work submitted to the `Scheduler`.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// An entry of the idle set, the heap pops the least fatigued worker first.
#[derive(Debug, Clone, Copy)]
struct IdleWorker {
    fatigue: f64,
    id: usize,
}

impl Ord for IdleWorker {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for IdleWorker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IdleWorker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleWorker {}

#[derive(Debug)]
struct Monitor {
    idle: BinaryHeap<IdleWorker>,
    in_flight: usize,
    closed: bool,
    failures: Vec<TaskFailure>,
}

#[derive(Debug)]
struct Shared {
    monitor: Mutex<Monitor>,
    changed: Condvar,
}

impl Shared {
    /// Returns `worker` to the idle set and retires one in-flight task.
    fn release(&self, worker: IdleWorker, failure: Option<TaskFailure>) {
        let mut monitor = self.monitor.lock();
        monitor.idle.push(worker);
        monitor.in_flight -= 1;
        monitor.failures.extend(failure);
        drop(monitor);

        self.changed.notify_all();
    }

    /// Blocks until every in-flight task has completed.
    fn drained(&self) -> MutexGuard<'_, Monitor> {
        let mut monitor = self.monitor.lock();
        while monitor.in_flight > 0 {
            self.changed.wait(&mut monitor);
        }

        monitor
    }
}

/// A fixed pool of worker threads that always hands work to the least
/// fatigued idle worker.
///
/// Submitters block while every worker is busy. Task failures never break
/// the bookkeeping: the worker goes back to the idle set and the in-flight
/// counter is decremented whether the task succeeded, failed or panicked.
/// Failures are collected and reported once the in-flight work drains.
#[derive(Debug)]
pub struct Scheduler {
    workers: Box<[Worker]>,
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Creates a new `Scheduler` with randomly fatigued workers.
    ///
    /// # Arguments
    /// * `workers` - The amount of worker threads to spawn.
    ///
    /// # Returns
    /// A `NoWorkers` error if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_fatigue(workers, RandFatigue::from_os_rng())
    }

    /// Creates a new `Scheduler` drawing each worker's fatigue from `fatigue_gen`.
    ///
    /// # Arguments
    /// * `workers` - The amount of worker threads to spawn.
    /// * `fatigue_gen` - The fatigue generator.
    ///
    /// # Returns
    /// A `NoWorkers` error if `workers` is zero, or a `Worker` error if a
    /// thread couldn't be spawned.
    pub fn with_fatigue<G: FatigueGen>(workers: usize, mut fatigue_gen: G) -> Result<Self> {
        if workers == 0 {
            return Err(SchedulerErr::NoWorkers);
        }

        let workers: Box<[Worker]> = (0..workers)
            .map(|id| Worker::new(id, fatigue_gen.sample(id)))
            .collect();

        let idle = workers
            .iter()
            .map(|worker| IdleWorker {
                fatigue: worker.fatigue(),
                id: worker.id(),
            })
            .collect();

        let scheduler = Self {
            workers,
            shared: Arc::new(Shared {
                monitor: Mutex::new(Monitor {
                    idle,
                    in_flight: 0,
                    closed: false,
                    failures: Vec::new(),
                }),
                changed: Condvar::new(),
            }),
        };

        for worker in scheduler.workers.iter() {
            worker.start().map_err(SchedulerErr::Worker)?;
        }

        info!(workers = scheduler.workers.len(); "scheduler started");
        Ok(scheduler)
    }

    /// Hands `task` to the least fatigued idle worker, blocking until one is idle.
    ///
    /// # Arguments
    /// * `task` - The task to run.
    ///
    /// # Returns
    /// A `Closed` error if the scheduler was shut down before a worker became
    /// idle, or a `Dispatch` error if the chosen worker refused the task.
    pub fn submit(&self, task: Task) -> Result<()> {
        let worker = {
            let mut monitor = self.shared.monitor.lock();
            let worker = loop {
                if monitor.closed {
                    return Err(SchedulerErr::Closed);
                }

                if let Some(worker) = monitor.idle.pop() {
                    break worker;
                }

                self.shared.changed.wait(&mut monitor);
            };

            monitor.in_flight += 1;
            worker
        };

        debug!(worker_id = worker.id, fatigue = worker.fatigue; "dispatching task");

        let shared = Arc::clone(&self.shared);
        let job: Job = Box::new(move || {
            let error = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(payload) => Some(anyhow!(
                    "task panicked: {}",
                    panic_message(payload.as_ref())
                )),
            };

            let failure = error.map(|error| {
                warn!(worker_id = worker.id; "task failed: {error:#}");
                TaskFailure {
                    worker_id: worker.id,
                    error,
                }
            });

            shared.release(worker, failure);
        });

        if let Err(e) = self.workers[worker.id].assign(job) {
            warn!(worker_id = worker.id; "dispatch failed, rolling back: {e}");
            self.shared.release(worker, None);
            return Err(SchedulerErr::Dispatch(e));
        }

        Ok(())
    }

    /// Submits every task and blocks until all in-flight work has completed.
    ///
    /// # Arguments
    /// * `tasks` - The batch of tasks, they may complete in any order.
    ///
    /// # Returns
    /// The first submission error, or a `TaskFailures` error holding every
    /// failure observed since the last drain. Either way the call only returns
    /// once nothing is in flight.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let submitted = tasks.into_iter().try_for_each(|task| self.submit(task));
        let failures = mem::take(&mut self.shared.drained().failures);

        submitted?;
        into_result(failures)
    }

    /// Waits for the in-flight work to drain, then stops and joins every worker.
    ///
    /// # Returns
    /// A `Closed` error if the scheduler was already shut down, a `Worker`
    /// error if a thread didn't terminate cleanly, or a `TaskFailures` error
    /// with failures of tasks submitted since the last drain.
    pub fn shutdown(&self) -> Result<()> {
        let failures = {
            let mut monitor = self.shared.drained();
            if monitor.closed {
                return Err(SchedulerErr::Closed);
            }

            monitor.closed = true;
            mem::take(&mut monitor.failures)
        };

        self.shared.changed.notify_all();
        self.stop_workers()?;

        info!(workers = self.workers.len(); "scheduler shut down");
        into_result(failures)
    }

    /// Returns a snapshot of every worker, ordered by id.
    pub fn report(&self) -> Vec<WorkerReport> {
        self.workers.iter().map(Worker::report).collect()
    }

    /// Returns the amount of workers.
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns the amount of tasks accepted but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.shared.monitor.lock().in_flight
    }

    /// Returns the amount of workers in the idle set.
    pub fn idle(&self) -> usize {
        self.shared.monitor.lock().idle.len()
    }

    fn stop_workers(&self) -> Result<()> {
        self.workers.iter().for_each(Worker::request_stop);

        let mut outcome = Ok(());
        for worker in self.workers.iter() {
            if let Err(e) = worker.await_termination() {
                outcome = outcome.and(Err(SchedulerErr::Worker(e)));
            }
        }

        outcome
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let closed = mem::replace(&mut self.shared.monitor.lock().closed, true);
        if closed {
            return;
        }

        self.shared.changed.notify_all();
        if let Err(e) = self.stop_workers() {
            warn!("dropping scheduler: {e}");
        }
    }
}

fn into_result(failures: Vec<TaskFailure>) -> Result<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(SchedulerErr::TaskFailures(failures))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Barrier,
            atomic::{AtomicUsize, Ordering::SeqCst},
        },
        thread,
    };

    use super::*;

    fn fixed(fatigues: &'static [f64]) -> impl FnMut(usize) -> f64 {
        move |id| fatigues[id]
    }

    fn current_worker() -> String {
        thread::current().name().unwrap_or_default().to_string()
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(Scheduler::new(0), Err(SchedulerErr::NoWorkers)));
    }

    #[test]
    fn idle_heap_pops_least_fatigued_then_lowest_id() {
        let mut heap: BinaryHeap<_> = [(1.2, 0), (0.7, 1), (0.7, 2), (0.5, 3)]
            .into_iter()
            .map(|(fatigue, id)| IdleWorker { fatigue, id })
            .collect();

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|w| w.id)).collect();
        assert_eq!(order, [3, 1, 2, 0]);
    }

    #[test]
    fn sequential_tasks_go_to_the_least_fatigued_worker() {
        let scheduler = Scheduler::with_fatigue(3, fixed(&[1.4, 0.6, 1.0])).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..4 {
            let seen = Arc::clone(&seen);
            let task: Task = Box::new(move || {
                seen.lock().push(current_worker());
                Ok(())
            });
            scheduler.submit_all([task]).unwrap();
        }

        assert_eq!(*seen.lock(), ["worker-1"; 4]);
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn concurrent_tasks_fill_workers_by_fatigue() {
        const WORKERS: usize = 3;

        let scheduler = Scheduler::with_fatigue(WORKERS, fixed(&[1.4, 0.6, 1.0])).unwrap();
        let barrier = Arc::new(Barrier::new(WORKERS));
        let seen = Arc::new(Mutex::new(vec![String::new(); WORKERS]));

        let tasks = (0..WORKERS).map(|i| {
            let barrier = Arc::clone(&barrier);
            let seen = Arc::clone(&seen);
            Box::new(move || {
                seen.lock()[i] = current_worker();
                barrier.wait();
                Ok(())
            }) as Task
        });

        scheduler.submit_all(tasks).unwrap();
        assert_eq!(*seen.lock(), ["worker-1", "worker-2", "worker-0"]);
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn collects_every_failure_and_keeps_bookkeeping() {
        let scheduler = Scheduler::with_fatigue(2, fixed(&[1., 1.])).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6).map(|i| {
            let done = Arc::clone(&done);
            Box::new(move || {
                match i {
                    1 => anyhow::bail!("task {i} failed"),
                    4 => panic!("task {i} panicked"),
                    _ => {}
                }
                done.fetch_add(1, SeqCst);
                Ok(())
            }) as Task
        });

        match scheduler.submit_all(tasks) {
            Err(SchedulerErr::TaskFailures(failures)) => {
                assert_eq!(failures.len(), 2);
                let messages: Vec<_> = failures.iter().map(|f| f.error.to_string()).collect();
                assert!(messages.contains(&"task 1 failed".to_string()));
                assert!(messages.contains(&"task panicked: task 4 panicked".to_string()));
            }
            other => panic!("expected task failures, got {other:?}"),
        }

        assert_eq!(done.load(SeqCst), 4);
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.idle(), 2);

        scheduler.submit_all([Box::new(|| Ok(())) as Task]).unwrap();
        scheduler.shutdown().unwrap();
    }

    #[test]
    fn dispatch_failure_rolls_back() {
        let scheduler = Scheduler::with_fatigue(1, fixed(&[1.])).unwrap();
        scheduler.workers[0].request_stop();
        scheduler.workers[0].await_termination().unwrap();

        let result = scheduler.submit(Box::new(|| Ok(())));

        assert!(matches!(result, Err(SchedulerErr::Dispatch(_))));
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.idle(), 1);
    }

    #[test]
    fn closed_after_shutdown() {
        let scheduler = Scheduler::new(2).unwrap();
        scheduler.shutdown().unwrap();

        assert!(matches!(
            scheduler.submit(Box::new(|| Ok(()))),
            Err(SchedulerErr::Closed)
        ));
        assert!(matches!(scheduler.shutdown(), Err(SchedulerErr::Closed)));
    }

    #[test]
    fn shutdown_waits_for_bare_submissions() {
        let scheduler = Scheduler::new(2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let done = Arc::clone(&done);
            scheduler
                .submit(Box::new(move || {
                    done.fetch_add(1, SeqCst);
                    Ok(())
                }))
                .unwrap();
        }

        scheduler.shutdown().unwrap();
        assert_eq!(done.load(SeqCst), 5);

        let tasks: u64 = scheduler.report().iter().map(|r| r.tasks).sum();
        assert_eq!(tasks, 5);
    }
}
