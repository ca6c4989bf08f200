use std::sync::Arc;

use log::{debug, info};

use super::{EngineErr, Node, OpKind, Result};
use crate::{
    memory::{Orientation, SharedMatrix},
    scheduling::{FatigueGen, Scheduler, Task, WorkerReport},
};

/// Resolves matrix expression trees bottom-up on a pool of worker threads.
///
/// Every step stages the operands of one resolvable node into the two
/// scratch matrices, fans one task per row of the left scratch out to the
/// scheduler, waits for the whole batch and folds the left scratch back into
/// the tree. The scratch matrices belong to this engine alone and are reused
/// by every step.
#[derive(Debug)]
pub struct LinearAlgebraEngine {
    left: Arc<SharedMatrix>,
    right: Arc<SharedMatrix>,
    scheduler: Scheduler,
}

impl LinearAlgebraEngine {
    /// Creates a new `LinearAlgebraEngine` with randomly fatigued workers.
    ///
    /// # Arguments
    /// * `threads` - The amount of worker threads.
    ///
    /// # Returns
    /// An error if `threads` is zero or the workers couldn't be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        Ok(Self::with_scheduler(Scheduler::new(threads)?))
    }

    /// Creates a new `LinearAlgebraEngine` with a custom fatigue generator.
    ///
    /// # Arguments
    /// * `threads` - The amount of worker threads.
    /// * `fatigue_gen` - The generator for the workers' fatigue factors.
    ///
    /// # Returns
    /// An error if `threads` is zero or the workers couldn't be spawned.
    pub fn with_fatigue<G: FatigueGen>(threads: usize, fatigue_gen: G) -> Result<Self> {
        Ok(Self::with_scheduler(Scheduler::with_fatigue(
            threads,
            fatigue_gen,
        )?))
    }

    fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            left: Arc::new(SharedMatrix::new()),
            right: Arc::new(SharedMatrix::new()),
            scheduler,
        }
    }

    /// Resolves `root` into a single matrix and shuts the scheduler down.
    ///
    /// The scheduler is shut down whether the reduction succeeds or not, so
    /// an engine runs at most once: any later call fails with `Closed`.
    ///
    /// # Arguments
    /// * `root` - The expression tree.
    ///
    /// # Returns
    /// The resolved root, a `Node::Matrix`.
    pub fn run(&mut self, mut root: Node) -> Result<Node> {
        info!(workers = self.scheduler.workers(); "resolving expression tree");

        let reduced = self.reduce(&mut root);
        for report in self.scheduler.report() {
            info!("{report}");
        }

        let shutdown = self.scheduler.shutdown();
        reduced?;
        shutdown?;

        Ok(root)
    }

    /// Resolves `root` in place, one node per step, until it's concrete.
    ///
    /// On error the failing node and its operands are left untouched.
    ///
    /// # Arguments
    /// * `root` - The expression tree.
    pub fn reduce(&mut self, root: &mut Node) -> Result<()> {
        let mut step = 0;

        while !root.is_concrete() {
            let node = root.find_resolvable_mut().ok_or(EngineErr::Unresolvable)?;
            self.load_and_compute(node)?;

            let rows = self.left.read_row_major()?;
            debug!(step = step, rows = rows.len(); "node resolved");
            node.resolve(rows);
            step += 1;
        }

        info!(steps = step; "expression tree resolved");
        Ok(())
    }

    /// Returns a snapshot of every worker.
    pub fn report(&self) -> Vec<WorkerReport> {
        self.scheduler.report()
    }

    /// Stages the operands of `node` and runs its row tasks to completion.
    ///
    /// Afterwards the left scratch matrix holds the node's value.
    fn load_and_compute(&self, node: &Node) -> Result<()> {
        let Node::Op { kind, children } = node else {
            return Ok(());
        };

        let kind = *kind;
        if children.len() != kind.arity() {
            return Err(EngineErr::Arity {
                kind,
                got: children.len(),
                expected: kind.arity(),
            });
        }

        let operand = |i: usize| {
            children[i]
                .as_matrix()
                .ok_or(EngineErr::NotConcrete { kind, operand: i })
        };

        match kind {
            OpKind::Negate | OpKind::Transpose => {
                self.left.load_row_major(operand(0)?)?;
                self.right.clear();
            }
            OpKind::Add => {
                self.left.load_row_major(operand(0)?)?;
                self.right.load_row_major(operand(1)?)?;
            }
            OpKind::Multiply => {
                self.left.load_row_major(operand(0)?)?;
                self.right.load_column_major(operand(1)?)?;
            }
        }

        self.check_shapes(kind)?;

        let tasks = self.create_tasks(kind)?;
        debug!(op = kind.as_str(), tasks = tasks.len(); "submitting row tasks");
        self.scheduler.submit_all(tasks)?;
        Ok(())
    }

    fn check_shapes(&self, kind: OpKind) -> Result<()> {
        let (left, right) = (self.left.as_ref(), self.right.as_ref());

        let fits = match kind {
            OpKind::Negate | OpKind::Transpose => true,
            OpKind::Add => left.len() == right.len() && unit_len(left) == unit_len(right),
            OpKind::Multiply => unit_len(left) == unit_len(right),
        };

        if !fits {
            return Err(EngineErr::DimensionMismatch {
                kind,
                lhs: shape(left),
                rhs: shape(right),
            });
        }

        Ok(())
    }

    /// Builds one task per row of the left scratch matrix.
    fn create_tasks(&self, kind: OpKind) -> Result<Vec<Task>> {
        (0..self.left.len())
            .map(|i| {
                let row = self.left.get(i)?;

                let task: Task = match kind {
                    OpKind::Add => {
                        let other = self.right.get(i)?;
                        Box::new(move || row.add(&other).map_err(anyhow::Error::from))
                    }
                    OpKind::Negate => Box::new(move || {
                        row.negate();
                        Ok(())
                    }),
                    OpKind::Transpose => Box::new(move || {
                        row.transpose();
                        Ok(())
                    }),
                    OpKind::Multiply => {
                        let right = Arc::clone(&self.right);
                        Box::new(move || row.vec_mat_mul(&right).map_err(anyhow::Error::from))
                    }
                };

                Ok(task)
            })
            .collect()
    }
}

/// The length of the units of `matrix`, zero if it has none.
fn unit_len(matrix: &SharedMatrix) -> usize {
    matrix.get(0).map_or(0, |unit| unit.len())
}

/// The logical `(rows, cols)` of `matrix`.
fn shape(matrix: &SharedMatrix) -> (usize, usize) {
    let (units, len) = (matrix.len(), unit_len(matrix));

    match matrix.orientation() {
        Orientation::Row => (units, len),
        Orientation::Column => (len, units),
    }
}
