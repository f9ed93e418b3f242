//! Columnar file output for converted granules.
//!
//! The sink side of the conversion: stream record batches into a GeoParquet
//! file ([`writer`]), read and write standalone Arrow schema files, dump
//! schemas for inspection ([`schema_io`]), and generate a curated schema
//! from a reference granule ([`generate`]).

pub mod error;
pub mod generate;
pub mod schema_io;
pub mod writer;

pub use error::{Result, SinkError};
pub use generate::generate_schema;
pub use schema_io::{
    format_schema, read_parquet_schema, read_schema_file, write_schema_file, DumpOptions,
};
pub use writer::{write_parquet, Codec};
