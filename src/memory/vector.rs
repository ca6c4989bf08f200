use std::ptr;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{MemoryErr, Orientation, Result, SharedMatrix};

/// The lock-protected state of a `SharedVector`.
#[derive(Debug)]
pub(super) struct VectorData {
    pub(super) values: Vec<f64>,
    pub(super) orientation: Orientation,
}

/// A single row or column of doubles guarded by its own read-write lock.
///
/// Every operation takes `&self`, so a vector can be shared between worker
/// threads behind an `Arc` and mutated in place. Operations involving two
/// vectors lock both of them in address order, which keeps any pair of
/// concurrent two-party calls free of lock-order inversions.
#[derive(Debug)]
pub struct SharedVector {
    data: RwLock<VectorData>,
}

impl SharedVector {
    /// Creates a new `SharedVector`.
    ///
    /// # Arguments
    /// * `values` - The vector's values.
    /// * `orientation` - Whether the values are a row or a column.
    ///
    /// # Returns
    /// A new `SharedVector` instance.
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            data: RwLock::new(VectorData {
                values,
                orientation,
            }),
        }
    }

    /// Reads the value at `index`.
    ///
    /// # Arguments
    /// * `index` - The position to read.
    ///
    /// # Returns
    /// An `IndexOutOfBounds` error if `index` is outside `[0, len)`.
    pub fn get(&self, index: usize) -> Result<f64> {
        let data = self.data.read();
        data.values
            .get(index)
            .copied()
            .ok_or(MemoryErr::IndexOutOfBounds {
                index,
                len: data.values.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.data.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orientation(&self) -> Orientation {
        self.data.read().orientation
    }

    /// Copies the current values out of the vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.read().values.clone()
    }

    /// Adds `other` element-wise into this vector.
    ///
    /// # Arguments
    /// * `other` - A vector with the same orientation and length.
    ///
    /// # Returns
    /// An error if the orientations or the lengths differ, in which case this
    /// vector is left untouched.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        if ptr::eq(self, other) {
            self.data
                .write()
                .values
                .iter_mut()
                .for_each(|v| *v += *v);

            return Ok(());
        }

        let (mut this, that) = self.write_with(other);
        check_orientation("add", that.orientation, this.orientation)?;
        check_len("add", that.values.len(), this.values.len())?;

        this.values
            .iter_mut()
            .zip(&that.values)
            .for_each(|(acc, v)| *acc += v);

        Ok(())
    }

    /// Flips the sign of every value.
    pub fn negate(&self) {
        self.data
            .write()
            .values
            .iter_mut()
            .for_each(|v| *v = -*v);
    }

    /// Flips the orientation tag, the values are left as they are.
    pub fn transpose(&self) {
        let mut data = self.data.write();
        data.orientation = data.orientation.flipped();
    }

    /// Computes the scalar product of this row against a column.
    ///
    /// # Arguments
    /// * `other` - A column vector of the same length.
    ///
    /// # Returns
    /// The sum of the element-wise products, or an error if this vector isn't
    /// a row, `other` isn't a column or their lengths differ.
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        if ptr::eq(self, other) {
            let this = self.data.read();
            return dot_product(&this, &this);
        }

        let (this, that) = self.read_with(other);
        dot_product(&this, &that)
    }

    /// Replaces this row with its product against a column-major matrix.
    ///
    /// The result has one value per column of `matrix` and stays a row.
    ///
    /// # Arguments
    /// * `matrix` - A column-oriented matrix whose columns match this row's length.
    ///
    /// # Returns
    /// An error if the orientations or the contraction lengths don't match,
    /// in which case this vector is left untouched.
    pub fn vec_mat_mul(&self, matrix: &SharedMatrix) -> Result<()> {
        check_orientation("vector-matrix multiply", matrix.orientation(), Orientation::Column)?;
        let columns = matrix.units();

        let mut this = self.data.write();
        check_orientation("vector-matrix multiply", this.orientation, Orientation::Row)?;

        let mut product = Vec::with_capacity(columns.len());
        for column in columns.iter() {
            if ptr::eq(column.as_ref(), self) {
                return Err(MemoryErr::OrientationMismatch {
                    op: "vector-matrix multiply",
                    got: Orientation::Row,
                    expected: Orientation::Column,
                });
            }

            let column = column.read();
            product.push(dot_product(&this, &column)?);
        }

        this.values = product;
        Ok(())
    }

    pub(super) fn read(&self) -> RwLockReadGuard<'_, VectorData> {
        self.data.read()
    }

    /// Write-locks `self` and read-locks `other` in address order.
    fn write_with<'a>(
        &'a self,
        other: &'a SharedVector,
    ) -> (
        RwLockWriteGuard<'a, VectorData>,
        RwLockReadGuard<'a, VectorData>,
    ) {
        if ptr::from_ref(self) < ptr::from_ref(other) {
            let this = self.data.write();
            (this, other.data.read())
        } else {
            let that = other.data.read();
            (self.data.write(), that)
        }
    }

    /// Read-locks `self` and `other` in address order.
    fn read_with<'a>(
        &'a self,
        other: &'a SharedVector,
    ) -> (
        RwLockReadGuard<'a, VectorData>,
        RwLockReadGuard<'a, VectorData>,
    ) {
        if ptr::from_ref(self) < ptr::from_ref(other) {
            let this = self.data.read();
            (this, other.data.read())
        } else {
            let that = other.data.read();
            (self.data.read(), that)
        }
    }
}

fn dot_product(row: &VectorData, column: &VectorData) -> Result<f64> {
    check_orientation("dot", row.orientation, Orientation::Row)?;
    check_orientation("dot", column.orientation, Orientation::Column)?;
    check_len("dot", column.values.len(), row.values.len())?;

    Ok(row
        .values
        .iter()
        .zip(&column.values)
        .map(|(a, b)| a * b)
        .sum())
}

fn check_orientation(op: &'static str, got: Orientation, expected: Orientation) -> Result<()> {
    if got != expected {
        return Err(MemoryErr::OrientationMismatch { op, got, expected });
    }

    Ok(())
}

fn check_len(op: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MemoryErr::LengthMismatch { op, got, expected });
    }

    Ok(())
}
