//! Resolves matrix expression trees bottom-up on a pool of fatigue aware
//! worker threads that share row and column vectors under per-vector locks.

pub mod config;
pub mod engine;
pub mod format;
pub mod memory;
pub mod scheduling;
