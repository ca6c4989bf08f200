use std::{error::Error, fmt};

use super::Orientation;

/// The memory module's result type.
pub type Result<T> = std::result::Result<T, MemoryErr>;

/// Failures raised by the shared vector and matrix storage.
///
/// Every variant but `Inconsistent` is a synchronous validation failure of
/// the caller's input; `Inconsistent` means a snapshot observed units that
/// disagree with each other, which the load contracts never produce.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryErr {
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    EmptyMatrix,
    EmptyRow {
        row: usize,
    },
    Ragged {
        row: usize,
        got: usize,
        expected: usize,
    },
    OrientationMismatch {
        op: &'static str,
        got: Orientation,
        expected: Orientation,
    },
    LengthMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
    Inconsistent {
        unit: usize,
    },
}

impl fmt::Display for MemoryErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryErr::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            MemoryErr::EmptyMatrix => f.write_str("matrix cannot be empty"),
            MemoryErr::EmptyRow { row } => write!(f, "matrix row {row} cannot be empty"),
            MemoryErr::Ragged { row, got, expected } => write!(
                f,
                "matrix must be rectangular: row {row} has {got} values, expected {expected}"
            ),
            MemoryErr::OrientationMismatch { op, got, expected } => {
                write!(f, "{op} requires a {expected} operand, got {got}")
            }
            MemoryErr::LengthMismatch { op, got, expected } => {
                write!(f, "{op} length mismatch: got {got}, expected {expected}")
            }
            MemoryErr::Inconsistent { unit } => {
                write!(f, "inconsistent matrix state at unit {unit}")
            }
        }
    }
}

impl Error for MemoryErr {}
