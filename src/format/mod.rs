mod error;
mod input;
mod output;

pub use error::{FormatErr, Result};
pub use input::{parse_str, read_file};
pub use output::{write_error, write_result};
