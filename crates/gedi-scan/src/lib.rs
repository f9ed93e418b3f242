//! Lazy columnar scan engine for GEDI granules.
//!
//! Turns the beam hierarchies of a GEDI HDF5 file into one logical columnar
//! table, read lazily in batches. The pipeline:
//!
//! - [`schema`] infers an Arrow schema by flattening a group (soft links
//!   included) and mapping native element types through [`dtype`]
//! - [`scan`] is the pull-based source: projection, predicate filtering, and
//!   row limiting are applied at the point of data access, so unrequested
//!   datasets are never read
//! - [`assemble`] unions the per-beam scans, renames columns to their base
//!   names, and derives the `time` and `geometry` columns
//!
//! Everything is a synchronous iterator of `Result<RecordBatch>`: no work
//! happens until a batch is pulled, and dropping a stream is the only
//! cancellation needed. Streams are pure — executing the same scan twice
//! with the same options yields identical batch sequences.

pub mod assemble;
pub mod batch;
pub mod beam;
pub mod dtype;
pub mod error;
pub mod scan;
pub mod schema;

// Re-exports
pub use assemble::{assemble, rename_column, FileScan, FileStream, MISSION_EPOCH_NS};
pub use batch::Batched;
pub use beam::{BeamKind, BeamName};
pub use error::{Result, ScanError};
pub use scan::{LazyScan, Predicate, ScanOptions, ScanStream, DEFAULT_BATCH_SIZE};
pub use schema::{flatten, infer_schema};
