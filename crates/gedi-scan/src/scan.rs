//! The pull-based lazy scan source.
//!
//! A [`LazyScan`] describes how to read a group; it holds no store handles
//! beyond the group itself and touches no data until a batch is pulled.
//! Projection, predicate filtering, and row limiting all happen at the point
//! of production, so a calling engine can push those down and never pay for
//! unrequested data.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch, UInt32Array};
use arrow::compute::{cast_with_options, filter_record_batch, take, CastOptions};
use arrow::datatypes::{Schema, SchemaRef};

use gedi_hdf5::{Group, StoreError};

use crate::batch::Batched;
use crate::error::{Result, ScanError};
use crate::schema::infer_schema;

/// Rows per batch when the caller does not specify one.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// A boolean row expression evaluated against produced columns.
///
/// Returns one mask entry per row; null mask entries drop the row.
pub trait Predicate: Send + Sync {
    fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray>;
}

impl<F> Predicate for F
where
    F: Fn(&RecordBatch) -> Result<BooleanArray> + Send + Sync,
{
    fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        self(batch)
    }
}

/// Materialization parameters supplied by the caller at pull time.
#[derive(Clone, Default)]
pub struct ScanOptions {
    /// Subset and order of column names to produce; `None` means every
    /// schema field in schema order.
    pub columns: Option<Vec<String>>,
    /// Row filter applied to each batch before it is yielded.
    pub predicate: Option<Arc<dyn Predicate>>,
    /// Maximum total rows to emit across all yielded batches.
    pub n_rows: Option<usize>,
    /// Rows per batch; defaults to [`DEFAULT_BATCH_SIZE`].
    pub batch_size: Option<usize>,
}

impl ScanOptions {
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_limit(mut self, n_rows: usize) -> Self {
        self.n_rows = Some(n_rows);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

/// A deferred scan over one group.
///
/// Construction never touches the store; even a schema naming datasets the
/// group does not have is accepted here and fails only when the scan is
/// materialized. The scan is pure: materializing it twice with identical
/// options yields identical batch sequences, so callers may replay it
/// freely.
#[derive(Clone)]
pub struct LazyScan {
    group: Arc<dyn Group>,
    schema: SchemaRef,
}

impl LazyScan {
    /// Describe a scan of `group` producing the columns of `schema`.
    pub fn new(group: Arc<dyn Group>, schema: SchemaRef) -> Self {
        Self { group, schema }
    }

    /// Describe a scan of `group`, inferring the schema from the group's own
    /// structure.
    pub fn infer(group: Arc<dyn Group>) -> Result<Self> {
        let schema = Arc::new(infer_schema(group.as_ref())?);
        Ok(Self::new(group, schema))
    }

    /// The schema this scan produces (before projection).
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Begin materializing with the given options.
    ///
    /// Requested columns are resolved against the live group here — a name
    /// with no backing dataset surfaces as [`ScanError::ColumnNotFound`] now
    /// rather than at construction. Data reads still happen per pulled
    /// batch.
    pub fn execute(&self, options: ScanOptions) -> Result<ScanStream> {
        let projected = project_schema(&self.schema, options.columns.as_deref(), self.group.path())?;
        let batch_size = options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

        let mut columns = Vec::with_capacity(projected.fields().len());
        for field in projected.fields() {
            let ds = self.group.dataset(field.name()).map_err(|e| match e {
                StoreError::NotFound(_) => {
                    ScanError::column_not_found(self.group.path(), field.name())
                }
                StoreError::WrongKind { path, .. } => ScanError::TypeMismatch {
                    path,
                    expected: "dataset",
                },
                other => ScanError::Store(other),
            })?;
            columns.push(ColumnReader {
                name: field.name().clone(),
                batched: Batched::new(ds, batch_size),
            });
        }

        let any_normal = columns.iter().any(|c| !c.batched.is_broadcast());
        Ok(ScanStream {
            schema: projected,
            columns,
            predicate: options.predicate.clone(),
            remaining: options.n_rows,
            any_normal,
            done: false,
        })
    }
}

/// Restrict `schema` to `names` (keeping their order), or keep it whole.
pub(crate) fn project_schema(
    schema: &SchemaRef,
    names: Option<&[String]>,
    group: &str,
) -> Result<SchemaRef> {
    let Some(names) = names else {
        return Ok(schema.clone());
    };
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let field = schema
            .field_with_name(name)
            .map_err(|_| ScanError::column_not_found(group, name))?;
        fields.push(field.clone());
    }
    Ok(Arc::new(Schema::new_with_metadata(
        fields,
        schema.metadata().clone(),
    )))
}

struct ColumnReader {
    name: String,
    batched: Batched,
}

/// One materialization of a [`LazyScan`].
pub struct ScanStream {
    schema: SchemaRef,
    columns: Vec<ColumnReader>,
    predicate: Option<Arc<dyn Predicate>>,
    remaining: Option<usize>,
    any_normal: bool,
    done: bool,
}

impl ScanStream {
    /// The projected schema of every batch this stream yields.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }

        // Pull this window's slice from every normal column; the window ends
        // the moment any normal dataset is exhausted.
        let mut slices: Vec<Option<ArrayRef>> = Vec::with_capacity(self.columns.len());
        let mut height: Option<(usize, String)> = None;
        for column in &mut self.columns {
            if column.batched.is_broadcast() {
                slices.push(None);
                continue;
            }
            let Some(slice) = column.batched.next() else {
                return Ok(None);
            };
            let slice = slice?;
            match &height {
                None => height = Some((slice.len(), column.name.clone())),
                Some((h, first)) if *h != slice.len() => {
                    return Err(ScanError::shape(format!(
                        "{} has {} rows but {} has {}",
                        first,
                        h,
                        column.name,
                        slice.len()
                    )));
                }
                Some(_) => {}
            }
            slices.push(Some(slice));
        }

        // With no normal columns the window height is undefined; emit the
        // broadcast values once as a single row and end.
        let height = height.map(|(h, _)| h).unwrap_or(1);

        let mut arrays = Vec::with_capacity(self.columns.len());
        for (column, slice) in self.columns.iter_mut().zip(slices) {
            let array = match slice {
                Some(array) => array,
                None => {
                    let Some(row) = column.batched.next() else {
                        return Ok(None);
                    };
                    repeat_row(row?, height)?
                }
            };
            arrays.push(array);
        }

        // Coerce each column to its declared type; lossy conversions are
        // allowed, impossible ones are schema validation failures.
        let arrays = self
            .schema
            .fields()
            .iter()
            .zip(arrays)
            .map(|(field, array)| {
                if array.data_type() == field.data_type() {
                    return Ok(array);
                }
                cast_with_options(
                    array.as_ref(),
                    field.data_type(),
                    &CastOptions {
                        safe: false,
                        ..Default::default()
                    },
                )
                .map_err(|e| ScanError::SchemaValidation {
                    column: field.name().clone(),
                    expected: field.data_type().to_string(),
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut batch = RecordBatch::try_new(self.schema.clone(), arrays)?;

        if let Some(predicate) = &self.predicate {
            let mask = predicate.evaluate(&batch)?;
            batch = filter_record_batch(&batch, &mask)?;
        }

        if let Some(remaining) = self.remaining {
            if batch.num_rows() >= remaining {
                batch = batch.slice(0, remaining);
                self.remaining = Some(0);
            } else {
                self.remaining = Some(remaining - batch.num_rows());
            }
        }

        if !self.any_normal {
            // Single-row broadcast-only batch; there is no more data.
            self.done = true;
        }

        Ok(Some(batch))
    }
}

impl Iterator for ScanStream {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // A failing batch aborts the materialization.
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Repeat the sole row of a one-row array to the given height.
fn repeat_row(row: ArrayRef, height: usize) -> Result<ArrayRef> {
    if row.len() == height {
        return Ok(row);
    }
    let indices = UInt32Array::from(vec![0u32; height]);
    Ok(take(row.as_ref(), &indices, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use arrow::compute::kernels::cmp::gt;
    use arrow::datatypes::DataType;
    use gedi_hdf5::{MemoryStore, SliceData};

    fn store_with_rows(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store.add_dataset(
            "g/values",
            &[n],
            SliceData::Float64((0..n).map(|i| i as f64).collect()),
        );
        store.add_dataset("g/scale", &[1], SliceData::Float64(vec![2.0]));
        store
    }

    fn scan(store: &MemoryStore) -> LazyScan {
        LazyScan::infer(store.group("g").unwrap()).unwrap()
    }

    #[test]
    fn test_broadcast_fills_to_window_height() {
        let store = store_with_rows(5);
        let batches: Vec<RecordBatch> = scan(&store)
            .execute(ScanOptions::default().with_batch_size(3))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].num_rows(), 3);
        assert_eq!(batches[1].num_rows(), 2);
        let scale = batches[1]
            .column_by_name("scale")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(scale.values(), &[2.0, 2.0]);
    }

    #[test]
    fn test_limit_truncates_final_batch() {
        let store = store_with_rows(1_000);
        let sizes: Vec<usize> = scan(&store)
            .execute(
                ScanOptions::default()
                    .with_batch_size(100)
                    .with_limit(150),
            )
            .unwrap()
            .map(|r| r.unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![100, 50]);
    }

    #[test]
    fn test_predicate_filters_each_batch() {
        let store = store_with_rows(10);
        let predicate: Arc<dyn Predicate> =
            Arc::new(|batch: &RecordBatch| -> Result<BooleanArray> {
                let values = batch.column_by_name("values").expect("values column");
                let threshold = Float64Array::new_scalar(6.5);
                Ok(gt(values.as_ref(), &threshold)?)
            });

        let total: usize = scan(&store)
            .execute(
                ScanOptions::default()
                    .with_batch_size(4)
                    .with_predicate(predicate),
            )
            .unwrap()
            .map(|r| r.unwrap().num_rows())
            .sum();
        assert_eq!(total, 3); // 7.0, 8.0, 9.0
    }

    #[test]
    fn test_missing_column_fails_at_execute_not_construction() {
        let store = store_with_rows(4);
        let schema = Arc::new(Schema::new(vec![arrow::datatypes::Field::new(
            "absent",
            DataType::Float64,
            false,
        )]));
        // Construction accepts a schema the group cannot satisfy.
        let lazy = LazyScan::new(store.group("g").unwrap(), schema);
        let err = lazy.execute(ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_shape_mismatch_surfaces_on_pull() {
        let store = MemoryStore::new();
        store.add_dataset("g/a", &[6], SliceData::Int64(vec![0; 6]));
        store.add_dataset("g/b", &[4], SliceData::Int64(vec![0; 4]));

        let mut stream = scan(&store).execute(ScanOptions::default().with_batch_size(3)).unwrap();
        // First window agrees (3 rows each).
        assert!(stream.next().unwrap().is_ok());
        // Second window: a has 3 rows left, b has 1.
        let err = stream.next().unwrap().unwrap_err();
        assert!(matches!(err, ScanError::Shape(_)));
        // The failing batch aborts the materialization.
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_schema_cast_is_lossy_but_validated() {
        let store = MemoryStore::new();
        store.add_dataset("g/x", &[3], SliceData::Float64(vec![0.9, 2.5, 1.4]));
        let schema = Arc::new(Schema::new(vec![arrow::datatypes::Field::new(
            "x",
            DataType::UInt8,
            false,
        )]));

        let batches: Vec<RecordBatch> = LazyScan::new(store.group("g").unwrap(), schema)
            .execute(ScanOptions::default())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        let x = batches[0]
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::UInt8Array>()
            .unwrap();
        assert_eq!(x.values(), &[0, 2, 1]);
    }

    #[test]
    fn test_broadcast_only_scan_emits_one_row() {
        let store = MemoryStore::new();
        store.add_dataset("g/scalar", &[1], SliceData::Float64(vec![5.0]));
        let batches: Vec<RecordBatch> = scan(&store)
            .execute(ScanOptions::default())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 1);
    }
}
