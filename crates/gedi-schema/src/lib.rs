//! Curated schemas and GeoParquet metadata for GEDI collections.
//!
//! Each supported collection (L2A, L2B, L4A, L4C) gets an abridged schema:
//! the datasets users actually query, plus the three datasets the conversion
//! itself consumes (`delta_time`, `lat_lowestmode`, `lon_lowestmode`).
//! Schemas are keyed by the `short_name` attribute found at the top level of
//! every granule.

pub mod catalog;
pub mod geo;

pub use catalog::{catalog_schema, CatalogError};
pub use geo::{geo_metadata_json, geo_schema_metadata, GEO_METADATA_KEY};
