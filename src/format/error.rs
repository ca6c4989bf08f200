use std::{error::Error, fmt, io};

/// The format module's result type.
pub type Result<T> = std::result::Result<T, FormatErr>;

/// Failures reading or writing expression documents.
#[derive(Debug)]
pub enum FormatErr {
    Io(io::Error),
    Json(serde_json::Error),
    UnknownOperator(String),
    NoOperands { operator: String },
}

impl fmt::Display for FormatErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatErr::Io(e) => write!(f, "io error: {e}"),
            FormatErr::Json(e) => write!(f, "failed to parse input: {e}"),
            FormatErr::UnknownOperator(operator) => {
                write!(f, "unsupported operator: {operator:?}")
            }
            FormatErr::NoOperands { operator } => {
                write!(f, "operator {operator:?} has no operands")
            }
        }
    }
}

impl Error for FormatErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FormatErr::Io(e) => Some(e),
            FormatErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FormatErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for FormatErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
