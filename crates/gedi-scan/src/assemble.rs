//! Beam union and derived columns.
//!
//! An assembled file scan reads each beam group through its own
//! [`LazyScan`], tags rows with the beam identity, concatenates the beam
//! streams vertically, renames columns to their base names, and replaces the
//! `delta_time` / `lon_lowestmode` / `lat_lowestmode` source columns with the
//! derived `time` and `geometry` columns.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, RecordBatch, StringArray, StructArray,
    TimestampNanosecondArray,
};
use arrow::compute::{cast_with_options, filter_record_batch, CastOptions};
use arrow::datatypes::{DataType, Field, FieldRef, Fields, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use gedi_hdf5::{Group, Node};

use crate::beam::BeamName;
use crate::error::{Result, ScanError};
use crate::scan::{project_schema, LazyScan, Predicate, ScanOptions, ScanStream};
use crate::schema::infer_schema;

/// Mission epoch (2018-01-01T00:00:00 UTC) in nanoseconds since the Unix
/// epoch. Every `delta_time` dataset holds seconds since this instant.
pub const MISSION_EPOCH_NS: i64 = 1_514_764_800_000_000_000;

/// The mission epoch as a timestamp.
pub fn mission_epoch() -> DateTime<Utc> {
    Utc.timestamp_nanos(MISSION_EPOCH_NS)
}

const COL_BEAM_NAME: &str = "beam_name";
const COL_BEAM_TYPE: &str = "beam_type";
const COL_TIME: &str = "time";
const COL_GEOMETRY: &str = "geometry";
const COL_DELTA_TIME: &str = "delta_time";
const COL_LAT: &str = "lat_lowestmode";
const COL_LON: &str = "lon_lowestmode";

/// Rename a column path to its base name.
///
/// Exception: `rx_processing_a<N>/...` paths rename to `<basename>_a<N>`,
/// because the per-algorithm groups duplicate base names (`zcross` exists
/// under both `rx_processing_a1` and `rx_processing_a2`). Paths not matching
/// the pattern always rename to the plain base name.
pub fn rename_column(column: &str) -> String {
    let base = column.rsplit('/').next().unwrap_or(column);
    if let Some(rest) = column.strip_prefix("rx_processing_a") {
        if let Some((digits, _)) = rest.split_once('/') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                return format!("{}_a{}", base, digits);
            }
        }
    }
    base.to_string()
}

fn geometry_fields() -> Fields {
    Fields::from(vec![
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
    ])
}

fn time_field() -> Field {
    Field::new(
        COL_TIME,
        DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
        false,
    )
}

fn geometry_field() -> Field {
    Field::new(COL_GEOMETRY, DataType::Struct(geometry_fields()), false)
}

/// Where an output column's values come from.
#[derive(Clone)]
enum OutputSource {
    /// Pass through an input column (by its pre-rename path).
    Input(String),
    BeamName,
    BeamType,
    /// Epoch plus `delta_time` seconds, nanosecond-truncated.
    Time { delta: String },
    /// Point struct `{x: lon, y: lat}`.
    Geometry { lon: String, lat: String },
}

/// A deferred scan over every beam group of one file.
#[derive(Clone)]
pub struct FileScan {
    beams: Vec<(BeamName, Arc<dyn Group>)>,
    input_schema: SchemaRef,
    output_schema: SchemaRef,
    /// Input path -> output name, in input schema order.
    rename: Vec<(String, String)>,
}

/// Discover the beam groups of `file` and describe their union.
///
/// Direct children whose base name exactly matches one of the eight beam
/// identifiers are beams; all other children are ignored. When no schema is
/// supplied, one is inferred from the first beam encountered and every other
/// beam is assumed to share it — an assumption, not a validated invariant.
pub fn assemble(file: Arc<dyn Group>, schema: Option<SchemaRef>) -> Result<FileScan> {
    let mut beams = Vec::new();
    for (name, node) in file.children()? {
        if let Node::Group(group) = node {
            if let Some(beam) = BeamName::from_group_name(&name) {
                beams.push((beam, group));
            }
        }
    }
    if beams.is_empty() {
        return Err(ScanError::NoBeams(file.path().to_string()));
    }

    let input_schema = match schema {
        Some(schema) => schema,
        None => {
            debug!(
                beam = beams[0].0.as_str(),
                "deriving schema from first beam; remaining beams are assumed identical"
            );
            Arc::new(infer_schema(beams[0].1.as_ref())?)
        }
    };

    let mut rename = Vec::with_capacity(input_schema.fields().len());
    let mut out_fields: Vec<Field> = Vec::new();
    for field in input_schema.fields() {
        let renamed = rename_column(field.name());
        rename.push((field.name().clone(), renamed.clone()));
        if matches!(renamed.as_str(), COL_DELTA_TIME | COL_LAT | COL_LON) {
            continue;
        }
        out_fields.push(field.as_ref().clone().with_name(renamed));
    }
    out_fields.push(Field::new(COL_BEAM_NAME, DataType::Utf8, false));
    out_fields.push(Field::new(COL_BEAM_TYPE, DataType::Utf8, false));
    out_fields.push(time_field());
    out_fields.push(geometry_field());

    Ok(FileScan {
        beams,
        input_schema,
        output_schema: Arc::new(Schema::new(out_fields)),
        rename,
    })
}

impl FileScan {
    /// The schema of the assembled output (after renames and derivations).
    pub fn output_schema(&self) -> &SchemaRef {
        &self.output_schema
    }

    /// The shared per-beam input schema.
    pub fn input_schema(&self) -> &SchemaRef {
        &self.input_schema
    }

    /// Input path whose renamed name is `output`, if any (first match wins).
    fn input_for(&self, output: &str) -> Option<&str> {
        self.rename
            .iter()
            .find(|(_, renamed)| renamed == output)
            .map(|(input, _)| input.as_str())
    }

    fn require_input(&self, output: &str) -> Result<String> {
        self.input_for(output)
            .map(str::to_string)
            .ok_or_else(|| ScanError::column_not_found("output", output))
    }

    /// Begin materializing the assembled table.
    ///
    /// Projection, predicate, and limit apply to the assembled output;
    /// projection is translated back to the input columns each requested
    /// output needs, so unrequested datasets are never read.
    pub fn execute(&self, options: ScanOptions) -> Result<FileStream> {
        let out_schema =
            project_schema(&self.output_schema, options.columns.as_deref(), "output")?;

        let mut inputs: Vec<String> = Vec::new();
        let need = |name: String, inputs: &mut Vec<String>| {
            if !inputs.contains(&name) {
                inputs.push(name);
            }
        };

        let mut outputs: Vec<(FieldRef, OutputSource)> = Vec::new();
        for field in out_schema.fields() {
            let source = match field.name().as_str() {
                COL_BEAM_NAME => OutputSource::BeamName,
                COL_BEAM_TYPE => OutputSource::BeamType,
                COL_TIME => {
                    let delta = self.require_input(COL_DELTA_TIME)?;
                    need(delta.clone(), &mut inputs);
                    OutputSource::Time { delta }
                }
                COL_GEOMETRY => {
                    let lon = self.require_input(COL_LON)?;
                    let lat = self.require_input(COL_LAT)?;
                    need(lon.clone(), &mut inputs);
                    need(lat.clone(), &mut inputs);
                    OutputSource::Geometry { lon, lat }
                }
                name => {
                    let input = self.require_input(name)?;
                    need(input.clone(), &mut inputs);
                    OutputSource::Input(input)
                }
            };
            outputs.push((Arc::clone(field), source));
        }

        // A request of only constant columns still needs a height driver.
        if inputs.is_empty() {
            inputs = self
                .input_schema
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }

        let input_index: HashMap<String, usize> = inputs
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Ok(FileStream {
            pending: self.beams.iter().cloned().collect(),
            current: None,
            input_schema: self.input_schema.clone(),
            inner_columns: inputs,
            input_index,
            schema: out_schema,
            outputs,
            predicate: options.predicate.clone(),
            remaining: options.n_rows,
            batch_size: options.batch_size,
            done: false,
        })
    }
}

/// One materialization of a [`FileScan`]: the concatenation of every beam's
/// transformed batch stream, in child-iteration order.
pub struct FileStream {
    pending: VecDeque<(BeamName, Arc<dyn Group>)>,
    current: Option<(BeamName, ScanStream)>,
    input_schema: SchemaRef,
    inner_columns: Vec<String>,
    input_index: HashMap<String, usize>,
    schema: SchemaRef,
    outputs: Vec<(FieldRef, OutputSource)>,
    predicate: Option<Arc<dyn Predicate>>,
    remaining: Option<usize>,
    batch_size: Option<usize>,
    done: bool,
}

impl FileStream {
    /// The projected output schema of every batch this stream yields.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn start_next_beam(&mut self) -> Result<bool> {
        let Some((beam, group)) = self.pending.pop_front() else {
            return Ok(false);
        };
        // The per-beam limit is only sound when no filter runs afterwards.
        let n_rows = if self.predicate.is_none() {
            self.remaining
        } else {
            None
        };
        let inner = LazyScan::new(group, self.input_schema.clone()).execute(ScanOptions {
            columns: Some(self.inner_columns.clone()),
            predicate: None,
            n_rows,
            batch_size: self.batch_size,
        })?;
        self.current = Some((beam, inner));
        Ok(true)
    }

    fn transform(&self, beam: BeamName, batch: &RecordBatch) -> Result<RecordBatch> {
        let rows = batch.num_rows();
        let column = |name: &str| -> Result<&ArrayRef> {
            let index = self
                .input_index
                .get(name)
                .copied()
                .ok_or_else(|| ScanError::column_not_found("output", name))?;
            Ok(batch.column(index))
        };

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.outputs.len());
        for (_, source) in &self.outputs {
            let array: ArrayRef = match source {
                OutputSource::Input(name) => column(name)?.clone(),
                OutputSource::BeamName => {
                    Arc::new(StringArray::from(vec![beam.as_str(); rows]))
                }
                OutputSource::BeamType => {
                    Arc::new(StringArray::from(vec![beam.kind().as_str(); rows]))
                }
                OutputSource::Time { delta } => {
                    let seconds = as_f64(column(delta)?, delta)?;
                    let values = seconds
                        .values()
                        .iter()
                        .map(|s| MISSION_EPOCH_NS + (s * 1e9) as i64);
                    Arc::new(
                        TimestampNanosecondArray::from_iter_values(values).with_timezone("UTC"),
                    )
                }
                OutputSource::Geometry { lon, lat } => {
                    let x: ArrayRef = Arc::new(as_f64(column(lon)?, lon)?);
                    let y: ArrayRef = Arc::new(as_f64(column(lat)?, lat)?);
                    Arc::new(StructArray::new(geometry_fields(), vec![x, y], None))
                }
            };
            arrays.push(array);
        }
        Ok(RecordBatch::try_new(self.schema.clone(), arrays)?)
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        loop {
            if self.current.is_none() && !self.start_next_beam()? {
                return Ok(None);
            }
            let pulled = match self.current.as_mut() {
                Some((beam, stream)) => (*beam, stream.next()),
                None => return Ok(None),
            };
            match pulled {
                (_, None) => {
                    self.current = None;
                    continue;
                }
                (beam, Some(inner)) => {
                    let mut batch = self.transform(beam, &inner?)?;
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
                    return Ok(Some(batch));
                }
            }
        }
    }
}

impl Iterator for FileStream {
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
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// View a column as `Float64`, casting when the declared type differs.
fn as_f64(array: &ArrayRef, name: &str) -> Result<Float64Array> {
    let array = if array.data_type() == &DataType::Float64 {
        array.clone()
    } else {
        cast_with_options(
            array.as_ref(),
            &DataType::Float64,
            &CastOptions {
                safe: false,
                ..Default::default()
            },
        )
        .map_err(|e| ScanError::SchemaValidation {
            column: name.to_string(),
            expected: DataType::Float64.to_string(),
            detail: e.to_string(),
        })?
    };
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| ScanError::SchemaValidation {
            column: name.to_string(),
            expected: DataType::Float64.to_string(),
            detail: format!("got {}", array.data_type()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_plain_basename() {
        assert_eq!(rename_column("path/to/my_dataset"), "my_dataset");
        assert_eq!(rename_column("geolocation/lat_lowestmode"), "lat_lowestmode");
        assert_eq!(rename_column("agbd"), "agbd");
    }

    #[test]
    fn test_rename_rx_processing() {
        assert_eq!(rename_column("rx_processing_a1/zcross"), "zcross_a1");
        assert_eq!(rename_column("rx_processing_a2/zcross"), "zcross_a2");
        assert_eq!(rename_column("rx_processing_a10/toploc"), "toploc_a10");
    }

    #[test]
    fn test_rename_rx_processing_requires_digits_and_slash() {
        // No digit run before the slash, or no slash at all: plain basename.
        assert_eq!(rename_column("rx_processing_ax/zcross"), "zcross");
        assert_eq!(rename_column("rx_processing_a2"), "rx_processing_a2");
    }

    #[test]
    fn test_mission_epoch_matches_constant() {
        let epoch = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(epoch.timestamp_nanos_opt().unwrap(), MISSION_EPOCH_NS);
        assert_eq!(mission_epoch(), epoch);
    }
}
