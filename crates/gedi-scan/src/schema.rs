//! Schema inference over a store group.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arrow::datatypes::{Field, Schema};
use tracing::debug;

use gedi_hdf5::{Dataset, Group, Node};

use crate::dtype;
use crate::error::Result;

/// Recursively enumerate every descendant dataset of `group`, keyed by its
/// slash-joined path relative to `group` (no leading slash).
///
/// Soft links are followed, under the link's own name: two differently-named
/// links to the same dataset produce two entries. Groups already visited
/// (by resolved path) are not descended into again, which bounds traversal
/// when links alias ancestor groups.
pub fn flatten(group: &dyn Group) -> Result<Vec<(String, Arc<dyn Dataset>)>> {
    let mut out = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(group.path().to_string());
    walk(group, "", &mut seen, &mut out)?;
    Ok(out)
}

fn walk(
    group: &dyn Group,
    prefix: &str,
    seen: &mut HashSet<String>,
    out: &mut Vec<(String, Arc<dyn Dataset>)>,
) -> Result<()> {
    for (name, node) in group.children()? {
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        match node {
            Node::Dataset(ds) => out.push((relative, ds)),
            Node::Group(subgroup) => {
                if seen.insert(subgroup.path().to_string()) {
                    walk(subgroup.as_ref(), &relative, seen, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Build a field describing one dataset: the mapped column type, non-nullable,
/// with every dataset attribute JSON-encoded into field metadata.
pub fn dataset_field(name: &str, ds: &dyn Dataset) -> Result<Field> {
    let dtype = dtype::column_type(ds.element_kind(), ds.shape());
    let field = Field::new(name, dtype, false);

    let attrs = ds.attributes()?;
    if attrs.is_empty() {
        return Ok(field);
    }
    let metadata: HashMap<String, String> = attrs
        .iter()
        .map(|(key, value)| (key.clone(), value.encode()))
        .collect();
    Ok(field.with_metadata(metadata))
}

/// Infer a schema for `group`: one field per flattened dataset, in discovery
/// order (callers wanting name-sorted output sort on top of this).
///
/// Attributes of `group` itself are ignored: the group is a structural
/// template shared by sibling groups whose attribute values may diverge, so
/// there is no single set of values to record at the schema level.
pub fn infer_schema(group: &dyn Group) -> Result<Schema> {
    let mut fields = Vec::new();
    for (name, ds) in flatten(group)? {
        fields.push(dataset_field(&name, ds.as_ref())?);
    }
    debug!(
        group = group.path(),
        fields = fields.len(),
        "inferred schema"
    );
    Ok(Schema::new(fields))
}
