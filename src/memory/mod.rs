mod error;
mod matrix;
mod orientation;
mod vector;

pub use error::{MemoryErr, Result};
pub use matrix::SharedMatrix;
pub use orientation::Orientation;
pub use vector::SharedVector;
