use std::sync::Arc;

use parking_lot::RwLock;

use super::{MemoryErr, Orientation, Result, SharedVector};

/// An ordered sequence of same-orientation `SharedVector`s.
///
/// Loads swap the whole unit sequence at once, element-wise work goes through
/// the units' own locks. A snapshot via `read_row_major` holds every unit's
/// read lock, acquired in ascending index order, for the length of the copy.
#[derive(Debug)]
pub struct SharedMatrix {
    units: RwLock<Arc<[Arc<SharedVector>]>>,
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMatrix {
    /// Creates a new empty `SharedMatrix`.
    pub fn new() -> Self {
        Self {
            units: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Creates a new row-oriented `SharedMatrix` out of `rows`.
    ///
    /// # Arguments
    /// * `rows` - A non-empty rectangular matrix in row-major order.
    ///
    /// # Returns
    /// An error if `rows` isn't a valid non-empty rectangle.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let matrix = Self::new();
        matrix.load_row_major(rows)?;
        Ok(matrix)
    }

    /// Replaces the contents with one row unit per row of `rows`.
    ///
    /// # Arguments
    /// * `rows` - A non-empty rectangular matrix in row-major order.
    ///
    /// # Returns
    /// An error if `rows` isn't a valid non-empty rectangle, the previous
    /// contents are kept in that case.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        validate_rectangular(rows)?;

        let units: Vec<_> = rows
            .iter()
            .map(|row| Arc::new(SharedVector::new(row.clone(), Orientation::Row)))
            .collect();

        *self.units.write() = Arc::from(units);
        Ok(())
    }

    /// Replaces the contents with one column unit per column of `rows`.
    ///
    /// The logical matrix is the same as with `load_row_major`, only the
    /// storage is transposed so each unit is ready for a contraction.
    ///
    /// # Arguments
    /// * `rows` - A non-empty rectangular matrix in row-major order.
    ///
    /// # Returns
    /// An error if `rows` isn't a valid non-empty rectangle, the previous
    /// contents are kept in that case.
    pub fn load_column_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        let width = validate_rectangular(rows)?;

        let units: Vec<_> = (0..width)
            .map(|j| {
                let column = rows.iter().map(|row| row[j]).collect();
                Arc::new(SharedVector::new(column, Orientation::Column))
            })
            .collect();

        *self.units.write() = Arc::from(units);
        Ok(())
    }

    /// Drops every unit, leaving an empty matrix.
    pub fn clear(&self) {
        *self.units.write() = Arc::from(Vec::new());
    }

    /// Takes a consistent row-major copy of the matrix.
    ///
    /// # Returns
    /// The logical matrix regardless of the stored orientation, an empty
    /// matrix if there are no units, or an `Inconsistent` error if the units
    /// disagree on their orientation or length.
    pub fn read_row_major(&self) -> Result<Vec<Vec<f64>>> {
        let units = self.units();
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let guards: Vec<_> = units.iter().map(|unit| unit.read()).collect();
        let orientation = guards[0].orientation;
        let width = guards[0].values.len();

        for (unit, guard) in guards.iter().enumerate() {
            if guard.orientation != orientation || guard.values.len() != width {
                return Err(MemoryErr::Inconsistent { unit });
            }
        }

        let rows = match orientation {
            Orientation::Row => guards.iter().map(|guard| guard.values.clone()).collect(),
            Orientation::Column => (0..width)
                .map(|i| guards.iter().map(|guard| guard.values[i]).collect())
                .collect(),
        };

        Ok(rows)
    }

    /// Returns the unit at `index`.
    ///
    /// # Returns
    /// An `IndexOutOfBounds` error if `index` is outside `[0, len)`.
    pub fn get(&self, index: usize) -> Result<Arc<SharedVector>> {
        let units = self.units.read();
        units
            .get(index)
            .cloned()
            .ok_or(MemoryErr::IndexOutOfBounds {
                index,
                len: units.len(),
            })
    }

    /// Returns the amount of units.
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the orientation of the units, `Row` for an empty matrix.
    pub fn orientation(&self) -> Orientation {
        self.units
            .read()
            .first()
            .map_or(Orientation::Row, |unit| unit.orientation())
    }

    /// Returns the current unit sequence.
    pub(crate) fn units(&self) -> Arc<[Arc<SharedVector>]> {
        Arc::clone(&self.units.read())
    }
}

/// Checks `rows` is a non-empty rectangle and returns its width.
fn validate_rectangular(rows: &[Vec<f64>]) -> Result<usize> {
    let first = rows.first().ok_or(MemoryErr::EmptyMatrix)?;
    let width = first.len();

    for (row, values) in rows.iter().enumerate() {
        if values.is_empty() {
            return Err(MemoryErr::EmptyRow { row });
        }

        if values.len() != width {
            return Err(MemoryErr::Ragged {
                row,
                got: values.len(),
                expected: width,
            });
        }
    }

    Ok(width)
}
