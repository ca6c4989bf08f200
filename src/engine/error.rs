use std::{error::Error, fmt};

use super::OpKind;
use crate::{memory::MemoryErr, scheduling::SchedulerErr};

/// The engine module's result type.
pub type Result<T> = std::result::Result<T, EngineErr>;

/// Tree reduction failures.
#[derive(Debug)]
pub enum EngineErr {
    Memory(MemoryErr),
    Scheduler(SchedulerErr),
    /// The tree isn't concrete yet but no operator has only concrete operands.
    Unresolvable,
    Arity {
        kind: OpKind,
        got: usize,
        expected: usize,
    },
    /// Operand shapes as logical `(rows, cols)`.
    DimensionMismatch {
        kind: OpKind,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },
    NotConcrete {
        kind: OpKind,
        operand: usize,
    },
}

impl fmt::Display for EngineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErr::Memory(e) => write!(f, "{e}"),
            EngineErr::Scheduler(e) => write!(f, "{e}"),
            EngineErr::Unresolvable => {
                f.write_str("no resolvable node found, but the root is not a matrix")
            }
            EngineErr::Arity {
                kind,
                got,
                expected,
            } => write!(
                f,
                "illegal operation: {kind} takes {expected} operand(s), got {got}"
            ),
            EngineErr::DimensionMismatch { kind, lhs, rhs } => write!(
                f,
                "illegal operation: dimensions mismatch for {kind}, {}x{} and {}x{}",
                lhs.0, lhs.1, rhs.0, rhs.1
            ),
            EngineErr::NotConcrete { kind, operand } => {
                write!(f, "operand {operand} of {kind} is not a matrix")
            }
        }
    }
}

impl Error for EngineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineErr::Memory(e) => Some(e),
            EngineErr::Scheduler(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MemoryErr> for EngineErr {
    fn from(value: MemoryErr) -> Self {
        Self::Memory(value)
    }
}

impl From<SchedulerErr> for EngineErr {
    fn from(value: SchedulerErr) -> Self {
        Self::Scheduler(value)
    }
}
