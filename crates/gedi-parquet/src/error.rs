//! Error types for the sink.

use thiserror::Error;

/// Errors writing or inspecting columnar files.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem failure, with the offending path.
    #[error("i/o error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Parquet encode/decode failure.
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow IPC or array failure.
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    /// Failure in the upstream scan being drained.
    #[error(transparent)]
    Scan(#[from] gedi_scan::ScanError),

    /// Store-level failure while generating a schema.
    #[error(transparent)]
    Store(#[from] gedi_hdf5::StoreError),

    /// The codec takes no compression level.
    #[error("{codec} does not allow a compression level")]
    LevelNotAllowed { codec: String },

    /// The codec rejected the requested compression level.
    #[error("invalid compression level {level} for {codec}: {detail}")]
    InvalidLevel {
        codec: String,
        level: i32,
        detail: String,
    },

    /// Unrecognized codec name.
    #[error("unknown compression codec {0:?}")]
    UnknownCodec(String),
}

impl SinkError {
    /// Create an Io error naming the path involved.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
