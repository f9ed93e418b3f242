//! Error types for store access.

use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No node exists at the given path.
    #[error("no such node: {0}")]
    NotFound(String),

    /// A node exists but is not the expected kind (group vs. dataset).
    #[error("{path} is not a {expected}")]
    WrongKind { path: String, expected: &'static str },

    /// The dataset's native element type has no columnar mapping.
    #[error("unsupported element type for {path}: {detail}")]
    UnsupportedType { path: String, detail: String },

    /// An attribute value falls outside the supported value union.
    #[error("unsupported attribute value for {path}@{name}: {detail}")]
    UnsupportedAttribute {
        path: String,
        name: String,
        detail: String,
    },

    /// Failed to open the underlying file.
    #[error("failed to open {path}: {detail}")]
    OpenFailed { path: String, detail: String },

    /// A raw read from the backend failed.
    #[error("failed to read {path}: {detail}")]
    ReadFailed { path: String, detail: String },

    /// A symbolic link chain did not resolve to a real node.
    #[error("unresolvable link at {path} (target {target})")]
    BadLink { path: String, target: String },
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a WrongKind error.
    pub fn wrong_kind(path: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongKind {
            path: path.into(),
            expected,
        }
    }

    /// Create an UnsupportedType error.
    pub fn unsupported_type(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedType {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
