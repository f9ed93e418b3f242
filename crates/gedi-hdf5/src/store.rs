//! Store-agnostic access traits.
//!
//! Paths are slash-separated and relative to the store root, with no leading
//! slash; the root group's path is the empty string. The first shape
//! dimension is the row dimension; trailing dimensions are flattened
//! row-major into [`SliceData`] buffers by `read_rows`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::attr::AttrValue;
use crate::error::Result;

/// Native element type of a stored dataset.
///
/// Backends normalize byte order to native before reporting a kind, so two
/// stores with different on-disk endianness describe identical elements.
/// `Opaque` marks variable- or fixed-length string data; it is always treated
/// as UTF-8 text downstream, never numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Opaque,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElementKind::Bool => "bool",
            ElementKind::Int8 => "int8",
            ElementKind::Int16 => "int16",
            ElementKind::Int32 => "int32",
            ElementKind::Int64 => "int64",
            ElementKind::Uint8 => "uint8",
            ElementKind::Uint16 => "uint16",
            ElementKind::Uint32 => "uint32",
            ElementKind::Uint64 => "uint64",
            ElementKind::Float32 => "float32",
            ElementKind::Float64 => "float64",
            ElementKind::Opaque => "string",
        };
        write!(f, "{}", s)
    }
}

/// A flat, row-major slice of dataset values.
///
/// For a dataset of shape `(rows, d1, .., dk)`, a slice covering `n` rows
/// holds `n * d1 * .. * dk` elements.
#[derive(Debug, Clone, PartialEq)]
pub enum SliceData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Str(Vec<String>),
}

impl SliceData {
    /// Number of elements in the buffer (not rows).
    pub fn len(&self) -> usize {
        match self {
            SliceData::Bool(v) => v.len(),
            SliceData::Int8(v) => v.len(),
            SliceData::Int16(v) => v.len(),
            SliceData::Int32(v) => v.len(),
            SliceData::Int64(v) => v.len(),
            SliceData::Uint8(v) => v.len(),
            SliceData::Uint16(v) => v.len(),
            SliceData::Uint32(v) => v.len(),
            SliceData::Uint64(v) => v.len(),
            SliceData::Float32(v) => v.len(),
            SliceData::Float64(v) => v.len(),
            SliceData::Str(v) => v.len(),
        }
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element kind this buffer holds.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            SliceData::Bool(_) => ElementKind::Bool,
            SliceData::Int8(_) => ElementKind::Int8,
            SliceData::Int16(_) => ElementKind::Int16,
            SliceData::Int32(_) => ElementKind::Int32,
            SliceData::Int64(_) => ElementKind::Int64,
            SliceData::Uint8(_) => ElementKind::Uint8,
            SliceData::Uint16(_) => ElementKind::Uint16,
            SliceData::Uint32(_) => ElementKind::Uint32,
            SliceData::Uint64(_) => ElementKind::Uint64,
            SliceData::Float32(_) => ElementKind::Float32,
            SliceData::Float64(_) => ElementKind::Float64,
            SliceData::Str(_) => ElementKind::Opaque,
        }
    }
}

/// A resolved child node: either a subgroup or a dataset.
#[derive(Clone)]
pub enum Node {
    Group(Arc<dyn Group>),
    Dataset(Arc<dyn Dataset>),
}

/// Attribute map for a node, keyed by attribute name.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A named, typed, shaped, read-only array of values.
pub trait Dataset: Send + Sync {
    /// Path of this dataset relative to the store root (no leading slash).
    fn path(&self) -> &str;

    /// Full shape; the first dimension is the row dimension. A
    /// zero-dimensional (scalar) dataset has an empty shape.
    fn shape(&self) -> &[usize];

    /// Native element kind, byte order already normalized.
    fn element_kind(&self) -> ElementKind;

    /// Attributes attached to this dataset.
    fn attributes(&self) -> Result<AttrMap>;

    /// Read rows `[start, stop)` as a flat row-major buffer; `stop` beyond
    /// the final row is clamped.
    fn read_rows(&self, start: usize, stop: usize) -> Result<SliceData>;

    /// Row count. A scalar (zero-dimensional) dataset counts as one row.
    fn rows(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }
}

/// A named container of datasets, subgroups, and links.
pub trait Group: Send + Sync {
    /// Path of this group relative to the store root (empty for the root).
    fn path(&self) -> &str;

    /// Direct children in a deterministic order, soft links resolved to
    /// their targets. Link names are kept: two differently-named links to
    /// the same dataset yield two entries.
    fn children(&self) -> Result<Vec<(String, Node)>>;

    /// Resolve a relative path to whatever node kind lives there.
    fn node(&self, relative: &str) -> Result<Node>;

    /// Resolve a relative path to a dataset.
    fn dataset(&self, relative: &str) -> Result<Arc<dyn Dataset>>;

    /// Resolve a relative path to a subgroup.
    fn group(&self, relative: &str) -> Result<Arc<dyn Group>>;

    /// Attributes attached to this group.
    fn attributes(&self) -> Result<AttrMap>;
}
