use std::ops::Range;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// The range every random fatigue factor is drawn from.
pub const FATIGUE_RANGE: Range<f64> = 0.5..1.5;

/// A `FatigueGen` assigns each worker its fixed fatigue factor at creation.
pub trait FatigueGen {
    /// Should produce the fatigue factor of the worker with id `worker_id`.
    ///
    /// # Arguments
    /// * `worker_id` - The id of the worker being created.
    fn sample(&mut self, worker_id: usize) -> f64;
}

impl<F: FnMut(usize) -> f64> FatigueGen for F {
    fn sample(&mut self, worker_id: usize) -> f64 {
        self(worker_id)
    }
}

/// A fatigue generator drawing uniformly from `FATIGUE_RANGE`.
pub struct RandFatigue<R: Rng> {
    rng: R,
}

impl<R: Rng> RandFatigue<R> {
    /// Creates a new `RandFatigue` generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandFatigue<StdRng> {
    /// Creates a new `RandFatigue` generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Creates a new reproducible `RandFatigue` generator.
    ///
    /// # Arguments
    /// * `seed` - The seed of the underlying generator.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> FatigueGen for RandFatigue<R> {
    fn sample(&mut self, _worker_id: usize) -> f64 {
        self.rng.random_range(FATIGUE_RANGE)
    }
}
