//! The GeoParquet `geo` metadata document.

use std::collections::HashMap;

use serde_json::json;

/// Reserved metadata key carrying the GeoParquet document.
pub const GEO_METADATA_KEY: &str = "geo";

/// Orbital coverage of the instrument: latitudes within ±51.6 degrees.
const ORBIT_BBOX: [f64; 4] = [-180.0, -51.6, 180.0, 51.6];

/// Build the GeoParquet metadata document as a JSON string.
///
/// Declares `geometry` as the primary column with native point encoding and
/// a bbox covering read from the output's `bbox` struct column convention.
pub fn geo_metadata_json() -> String {
    json!({
        "version": "1.1.0",
        "primary_column": "geometry",
        "columns": {
            "geometry": {
                "encoding": "point",
                "geometry_types": ["Point"],
                "bbox": ORBIT_BBOX,
                "covering": {
                    "bbox": {
                        "xmax": ["bbox", "xmax"],
                        "xmin": ["bbox", "xmin"],
                        "ymax": ["bbox", "ymax"],
                        "ymin": ["bbox", "ymin"],
                    }
                },
            },
        },
    })
    .to_string()
}

/// The `geo` document as schema-level metadata.
pub fn geo_schema_metadata() -> HashMap<String, String> {
    HashMap::from([(GEO_METADATA_KEY.to_string(), geo_metadata_json())])
}
