//! Batched reading of a single dataset.

use std::sync::Arc;

use arrow::array::ArrayRef;

use gedi_hdf5::Dataset;

use crate::dtype;
use crate::error::Result;

/// Lazily batch a dataset into row slices of at most `batch_size` rows.
///
/// A dataset with exactly one row is a broadcast (scalar) column: the
/// iterator repeats the sole row forever, so it can be zipped against
/// many-row datasets without the caller special-casing broadcast logic. The
/// one-row test is deliberate source behavior — a genuinely single-row
/// dataset is indistinguishable from a scalar constant here.
///
/// A dataset with multiple rows yields consecutive slices of `batch_size`
/// rows; the final slice holds `rows % batch_size` rows (or `batch_size`
/// when that remainder is zero). No cross-dataset height validation happens
/// here; the scan source checks heights when it assembles a batch.
pub struct Batched {
    ds: Arc<dyn Dataset>,
    batch_size: usize,
    offset: usize,
    rows: usize,
    broadcast: Option<ArrayRef>,
}

impl Batched {
    pub fn new(ds: Arc<dyn Dataset>, batch_size: usize) -> Self {
        let rows = ds.rows();
        Self {
            ds,
            batch_size,
            offset: 0,
            rows,
            broadcast: None,
        }
    }

    /// Whether this dataset is a single-row broadcast column.
    pub fn is_broadcast(&self) -> bool {
        self.rows == 1
    }

    fn read(&self, start: usize, stop: usize) -> Result<ArrayRef> {
        let data = self.ds.read_rows(start, stop)?;
        dtype::build_array(self.ds.shape(), data)
    }
}

impl Iterator for Batched {
    type Item = Result<ArrayRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_broadcast() {
            if let Some(row) = &self.broadcast {
                return Some(Ok(row.clone()));
            }
            return match self.read(0, 1) {
                Ok(row) => {
                    self.broadcast = Some(row.clone());
                    Some(Ok(row))
                }
                Err(e) => Some(Err(e)),
            };
        }

        if self.offset >= self.rows {
            return None;
        }
        let stop = (self.offset + self.batch_size).min(self.rows);
        let result = self.read(self.offset, stop);
        self.offset = stop;
        Some(result)
    }
}
