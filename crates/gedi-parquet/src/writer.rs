//! Streaming Parquet writer.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use tracing::info;

use crate::error::{Result, SinkError};

/// Supported compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Brotli,
    Gzip,
    Lz4,
    Snappy,
    Zstd,
}

impl Codec {
    pub fn as_str(self) -> &'static str {
        match self {
            Codec::Brotli => "brotli",
            Codec::Gzip => "gzip",
            Codec::Lz4 => "lz4",
            Codec::Snappy => "snappy",
            Codec::Zstd => "zstd",
        }
    }

    /// Resolve to a Parquet compression setting.
    ///
    /// The compression level has a different meaning per codec and not every
    /// codec accepts one; passing a level to lz4 or snappy is an error, as
    /// is a level outside the codec's accepted range.
    pub fn compression(self, level: Option<i32>) -> Result<Compression> {
        let invalid = |detail: String| SinkError::InvalidLevel {
            codec: self.as_str().to_string(),
            level: level.unwrap_or_default(),
            detail,
        };
        match self {
            Codec::Brotli => Ok(Compression::BROTLI(match level {
                Some(l) => BrotliLevel::try_new(l as u32).map_err(|e| invalid(e.to_string()))?,
                None => BrotliLevel::default(),
            })),
            Codec::Gzip => Ok(Compression::GZIP(match level {
                Some(l) => GzipLevel::try_new(l as u32).map_err(|e| invalid(e.to_string()))?,
                None => GzipLevel::default(),
            })),
            Codec::Zstd => Ok(Compression::ZSTD(match level {
                Some(l) => ZstdLevel::try_new(l).map_err(|e| invalid(e.to_string()))?,
                None => ZstdLevel::default(),
            })),
            Codec::Lz4 | Codec::Snappy => {
                if level.is_some() {
                    return Err(SinkError::LevelNotAllowed {
                        codec: self.as_str().to_string(),
                    });
                }
                Ok(match self {
                    Codec::Lz4 => Compression::LZ4_RAW,
                    _ => Compression::SNAPPY,
                })
            }
        }
    }
}

impl FromStr for Codec {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "brotli" => Ok(Codec::Brotli),
            "gzip" => Ok(Codec::Gzip),
            "lz4" => Ok(Codec::Lz4),
            "snappy" => Ok(Codec::Snappy),
            "zstd" => Ok(Codec::Zstd),
            other => Err(SinkError::UnknownCodec(other.to_string())),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drain a batch stream into a Parquet file.
///
/// Batches are written as they are pulled, so the whole table is never
/// materialized at once. `metadata` entries (e.g. the `geo` document) land
/// in the file footer. Returns the number of rows written.
pub fn write_parquet<I>(
    path: &Path,
    schema: SchemaRef,
    batches: I,
    codec: Codec,
    level: Option<i32>,
    metadata: Vec<(String, String)>,
) -> Result<u64>
where
    I: IntoIterator<Item = gedi_scan::Result<RecordBatch>>,
{
    let compression = codec.compression(level)?;
    let key_values: Vec<KeyValue> = metadata
        .into_iter()
        .map(|(key, value)| KeyValue::new(key, value))
        .collect();
    let properties = WriterProperties::builder()
        .set_compression(compression)
        .set_key_value_metadata((!key_values.is_empty()).then_some(key_values))
        .build();

    let file = File::create(path).map_err(|e| SinkError::io(path.display().to_string(), e))?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(properties))?;

    let mut rows: u64 = 0;
    for batch in batches {
        let batch = batch?;
        rows += batch.num_rows() as u64;
        writer.write(&batch)?;
    }
    writer.close()?;

    info!(path = %path.display(), rows, codec = codec.as_str(), "wrote parquet file");
    Ok(rows)
}
