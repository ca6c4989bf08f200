use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering::SeqCst},
    },
    thread,
    time::Duration,
};

use lae::scheduling::{FATIGUE_RANGE, RandFatigue, Scheduler, SchedulerErr, Task};
use parking_lot::Mutex;

const TASKS: usize = 64;
const WORKERS: usize = 4;

#[test]
fn counting_tasks_run_exactly_once() {
    let scheduler = Scheduler::with_fatigue(WORKERS, RandFatigue::seeded(11)).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let per_worker = Arc::new(Mutex::new(HashMap::<String, usize>::new()));

    let tasks = (0..TASKS).map(|_| {
        let counter = Arc::clone(&counter);
        let active = Arc::clone(&active);
        let max_active = Arc::clone(&max_active);
        let per_worker = Arc::clone(&per_worker);

        Box::new(move || {
            let name = thread::current().name().unwrap_or_default().to_string();
            {
                let mut per_worker = per_worker.lock();
                let running = per_worker.entry(name.clone()).or_default();
                assert_eq!(*running, 0, "{name} got a second task");
                *running += 1;
            }

            let now = active.fetch_add(1, SeqCst) + 1;
            max_active.fetch_max(now, SeqCst);
            thread::sleep(Duration::from_millis(1));
            counter.fetch_add(1, SeqCst);
            active.fetch_sub(1, SeqCst);

            *per_worker.lock().entry(name).or_default() -= 1;
            Ok(())
        }) as Task
    });

    scheduler.submit_all(tasks).unwrap();

    assert_eq!(counter.load(SeqCst), TASKS);
    assert!(max_active.load(SeqCst) <= WORKERS);
    assert_eq!(scheduler.in_flight(), 0);
    assert_eq!(scheduler.idle(), WORKERS);

    scheduler.shutdown().unwrap();
}

#[test]
fn report_covers_every_worker() {
    let scheduler = Scheduler::with_fatigue(WORKERS, RandFatigue::seeded(3)).unwrap();

    let tasks = (0..TASKS).map(|_| Box::new(|| Ok(())) as Task);
    scheduler.submit_all(tasks).unwrap();
    scheduler.shutdown().unwrap();

    let report = scheduler.report();
    let ids: Vec<_> = report.iter().map(|r| r.id).collect();
    assert_eq!(ids, (0..WORKERS).collect::<Vec<_>>());

    for entry in &report {
        assert!(FATIGUE_RANGE.contains(&entry.fatigue));
    }

    let tasks: u64 = report.iter().map(|r| r.tasks).sum();
    assert_eq!(tasks, TASKS as u64);
}

#[test]
fn failures_do_not_stop_the_batch() {
    let scheduler = Scheduler::with_fatigue(2, RandFatigue::seeded(5)).unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    let tasks = (0..10).map(|i| {
        let done = Arc::clone(&done);
        Box::new(move || {
            done.fetch_add(1, SeqCst);
            if i % 3 == 0 {
                anyhow::bail!("row {i} rejected");
            }
            Ok(())
        }) as Task
    });

    match scheduler.submit_all(tasks) {
        Err(SchedulerErr::TaskFailures(failures)) => assert_eq!(failures.len(), 4),
        other => panic!("expected task failures, got {other:?}"),
    }

    assert_eq!(done.load(SeqCst), 10);
    scheduler.shutdown().unwrap();
}

#[test]
fn dropping_a_running_scheduler_joins_its_workers() {
    let done = Arc::new(AtomicUsize::new(0));

    {
        let scheduler = Scheduler::new(2).unwrap();
        let tasks = (0..8).map(|_| {
            let done = Arc::clone(&done);
            Box::new(move || {
                done.fetch_add(1, SeqCst);
                Ok(())
            }) as Task
        });
        scheduler.submit_all(tasks).unwrap();
    }

    assert_eq!(done.load(SeqCst), 8);
    assert_eq!(Arc::strong_count(&done), 1);
}
