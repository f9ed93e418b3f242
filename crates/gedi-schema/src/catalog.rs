//! Per-collection curated schemas, keyed by the granule `short_name`.

use std::sync::{Arc, OnceLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use thiserror::Error;

use crate::geo::geo_schema_metadata;

/// Errors from catalog lookup.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The collection identifier has no curated schema.
    #[error("no schema known for collection {0:?}")]
    UnknownCollection(String),
}

/// Look up the curated schema for a collection short name.
///
/// L4C granules are inconsistent: some carry `GEDI_WSCI` and some
/// `GEDI04_C`; both resolve to the same schema. Schemas are built once and
/// cached for the life of the process.
pub fn catalog_schema(short_name: &str) -> Result<SchemaRef, CatalogError> {
    match short_name {
        "GEDI_L2A" => Ok(l2a_schema()),
        "GEDI_L2B" => Ok(l2b_schema()),
        "GEDI_L4A" => Ok(l4a_schema()),
        "GEDI_WSCI" | "GEDI04_C" => Ok(l4c_schema()),
        other => Err(CatalogError::UnknownCollection(other.to_string())),
    }
}

fn field(name: &str, dtype: DataType) -> Field {
    Field::new(name, dtype, false)
}

fn make_schema(fields: Vec<Field>) -> SchemaRef {
    Arc::new(Schema::new_with_metadata(fields, geo_schema_metadata()))
}

/// Elevation and relative-height product.
fn l2a_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            make_schema(vec![
                field("shot_number", DataType::UInt64),
                field("delta_time", DataType::Float64),
                field("lat_lowestmode", DataType::Float64),
                field("lon_lowestmode", DataType::Float64),
                field("elev_lowestmode", DataType::Float32),
                field("elev_highestreturn", DataType::Float32),
                field("quality_flag", DataType::UInt8),
                field("degrade_flag", DataType::UInt8),
                field("surface_flag", DataType::UInt8),
                field("sensitivity", DataType::Float32),
                field("solar_elevation", DataType::Float32),
                field("selected_algorithm", DataType::UInt8),
                field("rx_processing_a1/zcross", DataType::Float32),
                field("rx_processing_a2/zcross", DataType::Float32),
                field("geolocation/sensitivity_a2", DataType::Float32),
            ])
        })
        .clone()
}

/// Canopy cover and vertical profile product. Geolocation lives in a
/// subgroup here, unlike L2A.
fn l2b_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            make_schema(vec![
                field("shot_number", DataType::UInt64),
                field("geolocation/delta_time", DataType::Float64),
                field("geolocation/lat_lowestmode", DataType::Float64),
                field("geolocation/lon_lowestmode", DataType::Float64),
                field("cover", DataType::Float32),
                field("pai", DataType::Float32),
                field("fhd_normal", DataType::Float32),
                field("omega", DataType::Float32),
                field("l2b_quality_flag", DataType::UInt8),
                field("algorithmrun_flag", DataType::UInt8),
                field("sensitivity", DataType::Float32),
                field("rh100", DataType::Int16),
            ])
        })
        .clone()
}

/// Aboveground biomass density product.
fn l4a_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            make_schema(vec![
                field("shot_number", DataType::UInt64),
                field("delta_time", DataType::Float64),
                field("lat_lowestmode", DataType::Float64),
                field("lon_lowestmode", DataType::Float64),
                field("agbd", DataType::Float32),
                field("agbd_se", DataType::Float32),
                field("l4_quality_flag", DataType::UInt8),
                field("degrade_flag", DataType::UInt8),
                field("surface_flag", DataType::UInt8),
                field("sensitivity", DataType::Float32),
                field("selected_algorithm", DataType::UInt8),
                field("solar_elevation", DataType::Float32),
            ])
        })
        .clone()
}

/// Waveform structural complexity product.
fn l4c_schema() -> SchemaRef {
    static SCHEMA: OnceLock<SchemaRef> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            make_schema(vec![
                field("shot_number", DataType::UInt64),
                field("delta_time", DataType::Float64),
                field("lat_lowestmode", DataType::Float64),
                field("lon_lowestmode", DataType::Float64),
                field("wsci", DataType::Float32),
                field("wsci_pi_lower", DataType::Float32),
                field("wsci_pi_upper", DataType::Float32),
                field("wsci_quality_flag", DataType::UInt8),
                field("degrade_flag", DataType::UInt8),
                field("sensitivity", DataType::Float32),
            ])
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_collections_resolve() {
        for name in ["GEDI_L2A", "GEDI_L2B", "GEDI_L4A", "GEDI_WSCI", "GEDI04_C"] {
            let schema = catalog_schema(name).unwrap();
            assert!(!schema.fields().is_empty(), "{name} schema is empty");
        }
    }

    #[test]
    fn test_l4c_short_names_share_one_schema() {
        let a = catalog_schema("GEDI_WSCI").unwrap();
        let b = catalog_schema("GEDI04_C").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_collection_is_named_in_error() {
        let err = catalog_schema("GEDI_L9Z").unwrap_err();
        assert!(err.to_string().contains("GEDI_L9Z"));
    }

    #[test]
    fn test_lookup_is_cached() {
        let a = catalog_schema("GEDI_L2A").unwrap();
        let b = catalog_schema("GEDI_L2A").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_every_schema_carries_conversion_inputs() {
        for name in ["GEDI_L2A", "GEDI_L2B", "GEDI_L4A", "GEDI_WSCI"] {
            let schema = catalog_schema(name).unwrap();
            for required in ["delta_time", "lat_lowestmode", "lon_lowestmode"] {
                assert!(
                    schema
                        .fields()
                        .iter()
                        .any(|f| f.name() == required || f.name().ends_with(&format!("/{required}"))),
                    "{name} lacks {required}"
                );
            }
        }
    }

    #[test]
    fn test_schemas_carry_geo_metadata() {
        let schema = catalog_schema("GEDI_L4A").unwrap();
        assert!(schema.metadata().contains_key("geo"));
    }
}
