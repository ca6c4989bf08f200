use std::{fmt, time::Duration};

/// Cumulative time accounting of a single worker.
#[derive(Debug, Default, Clone)]
pub struct WorkerMetrics {
    pub busy: Duration,
    pub idle: Duration,
    pub tasks: u64,
}

impl WorkerMetrics {
    #[inline]
    pub fn add_busy(&mut self, elapsed: Duration) {
        self.busy += elapsed;
        self.tasks += 1;
    }

    #[inline]
    pub fn add_idle(&mut self, elapsed: Duration) {
        self.idle += elapsed;
    }
}

/// A point-in-time snapshot of a worker, for observability only.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub id: usize,
    pub fatigue: f64,
    pub busy: Duration,
    pub idle: Duration,
    pub tasks: u64,
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "worker {} fatigue={:.3} busy={:?} idle={:?} tasks={}",
            self.id, self.fatigue, self.busy, self.idle, self.tasks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_time_counts_tasks() {
        let mut metrics = WorkerMetrics::default();
        metrics.add_busy(Duration::from_millis(3));
        metrics.add_busy(Duration::from_millis(2));
        metrics.add_idle(Duration::from_millis(1));

        assert_eq!(metrics.tasks, 2);
        assert_eq!(metrics.busy, Duration::from_millis(5));
        assert_eq!(metrics.idle, Duration::from_millis(1));
    }

    #[test]
    fn report_line() {
        let report = WorkerReport {
            id: 3,
            fatigue: 0.75,
            busy: Duration::from_millis(2),
            idle: Duration::ZERO,
            tasks: 4,
        };

        assert_eq!(
            report.to_string(),
            "worker 3 fatigue=0.750 busy=2ms idle=0ns tasks=4"
        );
    }
}
