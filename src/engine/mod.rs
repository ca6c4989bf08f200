mod error;
mod node;
mod reducer;

pub use error::{EngineErr, Result};
pub use node::{Node, OpKind};
pub use reducer::LinearAlgebraEngine;
