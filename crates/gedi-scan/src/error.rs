//! Error types for the scan engine.

use thiserror::Error;

use gedi_hdf5::StoreError;

/// Errors that can occur while inferring schemas or materializing scans.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A requested column has no backing dataset.
    #[error("column not found in {group:?}: {column}")]
    ColumnNotFound { group: String, column: String },

    /// The file contains no beam groups to assemble.
    #[error("no beam groups found in {0:?}")]
    NoBeams(String),

    /// A resolved node is not the expected kind.
    #[error("{path} is not a {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    /// Column heights disagree within a single batch.
    #[error("column height mismatch: {0}")]
    Shape(String),

    /// A produced column cannot be brought to its declared schema type.
    #[error("column {column} does not match schema type {expected}: {detail}")]
    SchemaValidation {
        column: String,
        expected: String,
        detail: String,
    },

    /// Store-level failure (missing node, unsupported native type, read
    /// error).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Arrow kernel or construction failure.
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

impl ScanError {
    /// Create a ColumnNotFound error.
    pub fn column_not_found(group: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            group: group.into(),
            column: column.into(),
        }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(path: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
        }
    }

    /// Create a Shape error.
    pub fn shape(detail: impl Into<String>) -> Self {
        Self::Shape(detail.into())
    }
}

/// Result type for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;
