use std::fmt;

/// Whether a vector's values are a row or a column of its logical matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    /// Returns the opposite orientation.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Self::Row => Self::Column,
            Self::Column => Self::Row,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}
