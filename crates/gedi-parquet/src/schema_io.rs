//! Standalone schema files and human-readable schema dumps.
//!
//! Generated schemas are persisted as Arrow IPC stream files containing just
//! the schema (no batches); `dump-schema` reads either those or the footer
//! of a written Parquet file.

use std::fs::File;
use std::path::Path;

use arrow::datatypes::{Schema, SchemaRef};
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use gedi_schema::GEO_METADATA_KEY;

use crate::error::{Result, SinkError};

/// Write `schema` to an Arrow IPC stream file, creating parent directories
/// as needed.
pub fn write_schema_file(schema: &Schema, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| SinkError::io(parent.display().to_string(), e))?;
    }
    let file = File::create(path).map_err(|e| SinkError::io(path.display().to_string(), e))?;
    let mut writer = StreamWriter::try_new(file, schema)?;
    writer.finish()?;
    Ok(())
}

/// Read the schema back from an Arrow IPC stream file.
pub fn read_schema_file(path: &Path) -> Result<SchemaRef> {
    let file = File::open(path).map_err(|e| SinkError::io(path.display().to_string(), e))?;
    let reader = StreamReader::try_new(file, None)?;
    Ok(reader.schema())
}

/// Read the Arrow schema and the `geo` footer document of a Parquet file.
pub fn read_parquet_schema(path: &Path) -> Result<(SchemaRef, Option<String>)> {
    let file = File::open(path).map_err(|e| SinkError::io(path.display().to_string(), e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let geo = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == GEO_METADATA_KEY))
        .and_then(|kv| kv.value.clone());
    Ok((builder.schema().clone(), geo))
}

/// Display options for [`format_schema`].
#[derive(Debug, Clone, Copy)]
pub struct DumpOptions {
    /// Limit each metadata value to a single short line.
    pub truncate_metadata: bool,
    /// Display field-level key/value metadata.
    pub show_field_metadata: bool,
    /// Display schema-level key/value metadata.
    pub show_schema_metadata: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            truncate_metadata: true,
            show_field_metadata: true,
            show_schema_metadata: true,
        }
    }
}

const TRUNCATE_WIDTH: usize = 80;

fn truncated(value: &str, truncate: bool) -> String {
    if !truncate || value.len() <= TRUNCATE_WIDTH {
        return value.to_string();
    }
    let mut cut = TRUNCATE_WIDTH;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &value[..cut])
}

/// Render a schema as text, one field per line, with optional metadata.
pub fn format_schema(schema: &Schema, options: &DumpOptions) -> String {
    let mut out = String::new();
    for field in schema.fields() {
        let nullability = if field.is_nullable() { "" } else { " not null" };
        out.push_str(&format!(
            "{}: {}{}\n",
            field.name(),
            field.data_type(),
            nullability
        ));
        if options.show_field_metadata && !field.metadata().is_empty() {
            out.push_str("  -- field metadata --\n");
            let mut keys: Vec<&String> = field.metadata().keys().collect();
            keys.sort();
            for key in keys {
                let value = truncated(&field.metadata()[key], options.truncate_metadata);
                out.push_str(&format!("  {}: '{}'\n", key, value));
            }
        }
    }
    if options.show_schema_metadata && !schema.metadata().is_empty() {
        out.push_str("-- schema metadata --\n");
        let mut keys: Vec<&String> = schema.metadata().keys().collect();
        keys.sort();
        for key in keys {
            let value = truncated(&schema.metadata()[key], options.truncate_metadata);
            out.push_str(&format!("{}: '{}'\n", key, value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use arrow::datatypes::{DataType, Field};

    fn sample_schema() -> Schema {
        let field = Field::new("agbd", DataType::Float32, false).with_metadata(HashMap::from([(
            "units".to_string(),
            "\"Mg / ha\"".to_string(),
        )]));
        Schema::new_with_metadata(
            vec![field, Field::new("shot_number", DataType::UInt64, false)],
            HashMap::from([("geo".to_string(), "{\"version\":\"1.1.0\"}".to_string())]),
        )
    }

    #[test]
    fn test_schema_file_round_trip() {
        let schema = sample_schema();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/schema.arrows");

        write_schema_file(&schema, &path).unwrap();
        let read = read_schema_file(&path).unwrap();
        assert_eq!(read.as_ref(), &schema);
    }

    #[test]
    fn test_format_lists_fields_and_metadata() {
        let text = format_schema(&sample_schema(), &DumpOptions::default());
        assert!(text.contains("agbd: Float32 not null"));
        assert!(text.contains("  -- field metadata --"));
        assert!(text.contains("  units: '\"Mg / ha\"'"));
        assert!(text.contains("-- schema metadata --"));
        assert!(text.contains("geo:"));
    }

    #[test]
    fn test_format_can_hide_metadata() {
        let options = DumpOptions {
            show_field_metadata: false,
            show_schema_metadata: false,
            ..Default::default()
        };
        let text = format_schema(&sample_schema(), &options);
        assert!(!text.contains("metadata"));
    }

    #[test]
    fn test_truncation() {
        let long = "x".repeat(200);
        assert_eq!(truncated(&long, true).len(), TRUNCATE_WIDTH + 3);
        assert_eq!(truncated(&long, false).len(), 200);
    }
}
