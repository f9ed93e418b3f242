//! Schema generation from a reference granule.
//!
//! Builds a curated schema by listing datasets (or dataset-holding
//! subgroups) of one representative beam group. Fields are named by base
//! name, so the output matches the post-rename column names of a converted
//! file, and sorted by name ascending.

use std::sync::Arc;

use arrow::datatypes::{Field, Schema};

use gedi_hdf5::{basename, Dataset, Group, Node};
use gedi_scan::schema::dataset_field;
use gedi_schema::geo_schema_metadata;

use crate::error::Result;

/// Select datasets under `group` by relative path.
///
/// A path naming a dataset yields that dataset; a path naming a subgroup
/// yields the subgroup's direct child datasets (non-recursively). A path
/// naming nothing is a NotFound error.
fn projected_datasets(group: &dyn Group, relative_paths: &[String]) -> Result<Vec<Arc<dyn Dataset>>> {
    let mut datasets = Vec::new();
    for relative in relative_paths {
        match group.node(relative)? {
            Node::Dataset(ds) => datasets.push(ds),
            Node::Group(subgroup) => {
                for (_, child) in subgroup.children()? {
                    if let Node::Dataset(ds) = child {
                        datasets.push(ds);
                    }
                }
            }
        }
    }
    Ok(datasets)
}

/// Generate a schema from the group at `group_path` within `root`.
///
/// One field per selected dataset, named by the dataset's base name, typed
/// by its native element type and shape, carrying its attributes as JSON
/// field metadata; fields sorted by name ascending; the GeoParquet document
/// attached as schema metadata.
pub fn generate_schema(
    root: &dyn Group,
    group_path: &str,
    relative_paths: &[String],
) -> Result<Schema> {
    let group = root.group(group_path.trim_matches('/'))?;

    let mut fields: Vec<Field> = Vec::new();
    for ds in projected_datasets(group.as_ref(), relative_paths)? {
        let name = basename(ds.path()).to_string();
        fields.push(dataset_field(&name, ds.as_ref())?);
    }
    fields.sort_by(|a, b| a.name().cmp(b.name()));

    Ok(Schema::new_with_metadata(fields, geo_schema_metadata()))
}
