//! Native HDF5 store backend using the hdf5-metno library.
//!
//! The hdf5 library converts file byte order to native byte order on read,
//! so element kinds reported here are already endianness-normalized. Soft
//! links resolve transparently on member access, and member enumeration
//! lists links under their own names, which is exactly the aliasing behavior
//! the scan engine expects.

use std::path::Path;
use std::sync::{Arc, Once};

use hdf5_metno as hdf5;
use hdf5_metno::types::{TypeDescriptor, VarLenUnicode};
use ndarray::s;
use tracing::debug;

use crate::attr::AttrValue;
use crate::error::{Result, StoreError};
use crate::store::{AttrMap, Dataset, ElementKind, Group, Node, SliceData};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when
/// errors are handled gracefully by the Rust code (e.g., when probing a name
/// that may be either a group or a dataset). This function disables that
/// output by calling H5Eset_auto2 with null handlers. It only needs to be
/// called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An opened HDF5 file.
pub struct Hdf5Store {
    file: hdf5::File,
}

impl Hdf5Store {
    /// Open an HDF5 file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        silence_hdf5_errors();
        let display = path.as_ref().display().to_string();
        let file = hdf5::File::open(path).map_err(|e| StoreError::OpenFailed {
            path: display.clone(),
            detail: e.to_string(),
        })?;
        debug!(path = %display, "opened hdf5 file");
        Ok(Self { file })
    }

    /// The root group of the file.
    pub fn root(&self) -> Result<Arc<dyn Group>> {
        let group = self
            .file
            .group("/")
            .map_err(|e| StoreError::read_failed("/", e.to_string()))?;
        Ok(Arc::new(NativeGroup::new(group)))
    }
}

fn relative_name(loc: &hdf5::Location) -> String {
    loc.name().trim_start_matches('/').to_string()
}

struct NativeGroup {
    group: hdf5::Group,
    path: String,
}

impl NativeGroup {
    fn new(group: hdf5::Group) -> Self {
        let path = relative_name(&group);
        Self { group, path }
    }
}

impl Group for NativeGroup {
    fn path(&self) -> &str {
        &self.path
    }

    fn children(&self) -> Result<Vec<(String, Node)>> {
        let names = self
            .group
            .member_names()
            .map_err(|e| StoreError::read_failed(self.path.clone(), e.to_string()))?;

        let mut children = Vec::with_capacity(names.len());
        for name in names {
            if let Ok(subgroup) = self.group.group(&name) {
                children.push((name, Node::Group(Arc::new(NativeGroup::new(subgroup)))));
            } else if let Ok(ds) = self.group.dataset(&name) {
                children.push((name, Node::Dataset(Arc::new(NativeDataset::new(ds)?))));
            }
            // Other object kinds (named datatypes) are not part of the data
            // model and are skipped.
        }
        Ok(children)
    }

    fn node(&self, relative: &str) -> Result<Node> {
        if let Ok(subgroup) = self.group.group(relative) {
            return Ok(Node::Group(Arc::new(NativeGroup::new(subgroup))));
        }
        if let Ok(ds) = self.group.dataset(relative) {
            return Ok(Node::Dataset(Arc::new(NativeDataset::new(ds)?)));
        }
        Err(StoreError::not_found(full_path(&self.path, relative)))
    }

    fn dataset(&self, relative: &str) -> Result<Arc<dyn Dataset>> {
        match self.node(relative)? {
            Node::Dataset(ds) => Ok(ds),
            Node::Group(_) => Err(StoreError::wrong_kind(
                full_path(&self.path, relative),
                "dataset",
            )),
        }
    }

    fn group(&self, relative: &str) -> Result<Arc<dyn Group>> {
        match self.node(relative)? {
            Node::Group(g) => Ok(g),
            Node::Dataset(_) => Err(StoreError::wrong_kind(
                full_path(&self.path, relative),
                "group",
            )),
        }
    }

    fn attributes(&self) -> Result<AttrMap> {
        attr_map(&self.group, &self.path)
    }
}

fn full_path(base: &str, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    }
}

struct NativeDataset {
    ds: hdf5::Dataset,
    path: String,
    shape: Vec<usize>,
    kind: ElementKind,
}

impl NativeDataset {
    fn new(ds: hdf5::Dataset) -> Result<Self> {
        let path = relative_name(&ds);
        let shape = ds.shape();
        let descriptor = ds
            .dtype()
            .and_then(|dt| dt.to_descriptor())
            .map_err(|e| StoreError::read_failed(path.clone(), e.to_string()))?;
        let kind = element_kind(&descriptor, &path)?;
        Ok(Self {
            ds,
            path,
            shape,
            kind,
        })
    }
}

fn element_kind(descriptor: &TypeDescriptor, path: &str) -> Result<ElementKind> {
    use hdf5_metno::types::{FloatSize, IntSize};

    Ok(match descriptor {
        TypeDescriptor::Boolean => ElementKind::Bool,
        TypeDescriptor::Integer(IntSize::U1) => ElementKind::Int8,
        TypeDescriptor::Integer(IntSize::U2) => ElementKind::Int16,
        TypeDescriptor::Integer(IntSize::U4) => ElementKind::Int32,
        TypeDescriptor::Integer(IntSize::U8) => ElementKind::Int64,
        TypeDescriptor::Unsigned(IntSize::U1) => ElementKind::Uint8,
        TypeDescriptor::Unsigned(IntSize::U2) => ElementKind::Uint16,
        TypeDescriptor::Unsigned(IntSize::U4) => ElementKind::Uint32,
        TypeDescriptor::Unsigned(IntSize::U8) => ElementKind::Uint64,
        TypeDescriptor::Float(FloatSize::U4) => ElementKind::Float32,
        TypeDescriptor::Float(FloatSize::U8) => ElementKind::Float64,
        // All string datatypes carry UTF-8 text as far as this data model is
        // concerned, regardless of declared width or padding.
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => ElementKind::Opaque,
        other => {
            return Err(StoreError::unsupported_type(path, format!("{}", other)));
        }
    })
}

impl Dataset for NativeDataset {
    fn path(&self) -> &str {
        &self.path
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn element_kind(&self) -> ElementKind {
        self.kind
    }

    fn attributes(&self) -> Result<AttrMap> {
        attr_map(&self.ds, &self.path)
    }

    fn read_rows(&self, start: usize, stop: usize) -> Result<SliceData> {
        let rows = self.rows();
        let start = start.min(rows);
        let stop = stop.min(rows);

        let map_err = |e: hdf5::Error| StoreError::read_failed(self.path.clone(), e.to_string());

        macro_rules! read {
            ($t:ty, $wrap:expr) => {{
                let values: Vec<$t> = match self.shape.len() {
                    0 => {
                        if start == 0 && stop > 0 {
                            vec![self.ds.read_scalar::<$t>().map_err(map_err)?]
                        } else {
                            Vec::new()
                        }
                    }
                    1 => self
                        .ds
                        .read_slice_1d::<$t, _>(s![start..stop])
                        .map_err(map_err)?
                        .to_vec(),
                    2 => self
                        .ds
                        .read_slice::<$t, _, ndarray::Ix2>(s![start..stop, ..])
                        .map_err(map_err)?
                        .into_iter()
                        .collect(),
                    3 => self
                        .ds
                        .read_slice::<$t, _, ndarray::Ix3>(s![start..stop, .., ..])
                        .map_err(map_err)?
                        .into_iter()
                        .collect(),
                    d => {
                        return Err(StoreError::unsupported_type(
                            self.path.clone(),
                            format!("{}-dimensional dataset", d),
                        ));
                    }
                };
                $wrap(values)
            }};
        }

        Ok(match self.kind {
            ElementKind::Bool => read!(bool, SliceData::Bool),
            ElementKind::Int8 => read!(i8, SliceData::Int8),
            ElementKind::Int16 => read!(i16, SliceData::Int16),
            ElementKind::Int32 => read!(i32, SliceData::Int32),
            ElementKind::Int64 => read!(i64, SliceData::Int64),
            ElementKind::Uint8 => read!(u8, SliceData::Uint8),
            ElementKind::Uint16 => read!(u16, SliceData::Uint16),
            ElementKind::Uint32 => read!(u32, SliceData::Uint32),
            ElementKind::Uint64 => read!(u64, SliceData::Uint64),
            ElementKind::Float32 => read!(f32, SliceData::Float32),
            ElementKind::Float64 => read!(f64, SliceData::Float64),
            ElementKind::Opaque => {
                let values: Vec<VarLenUnicode> = match self.shape.len() {
                    0 => {
                        if start == 0 && stop > 0 {
                            vec![self.ds.read_scalar::<VarLenUnicode>().map_err(map_err)?]
                        } else {
                            Vec::new()
                        }
                    }
                    1 => self
                        .ds
                        .read_slice_1d::<VarLenUnicode, _>(s![start..stop])
                        .map_err(map_err)?
                        .to_vec(),
                    d => {
                        return Err(StoreError::unsupported_type(
                            self.path.clone(),
                            format!("{}-dimensional string dataset", d),
                        ));
                    }
                };
                SliceData::Str(values.into_iter().map(|s| s.to_string()).collect())
            }
        })
    }
}

/// Read every attribute of a node into the supported value union.
fn attr_map(loc: &hdf5::Location, path: &str) -> Result<AttrMap> {
    let names = loc
        .attr_names()
        .map_err(|e| StoreError::read_failed(path.to_string(), e.to_string()))?;

    let mut attrs = AttrMap::new();
    for name in names {
        let attr = loc
            .attr(&name)
            .map_err(|e| StoreError::read_failed(path.to_string(), e.to_string()))?;
        attrs.insert(name.clone(), attr_value(&attr, path, &name)?);
    }
    Ok(attrs)
}

fn attr_value(attr: &hdf5::Attribute, path: &str, name: &str) -> Result<AttrValue> {
    let unsupported = |detail: String| StoreError::UnsupportedAttribute {
        path: path.to_string(),
        name: name.to_string(),
        detail,
    };
    let read_err =
        |e: hdf5::Error| unsupported(format!("read failed: {}", e));

    let descriptor = attr
        .dtype()
        .and_then(|dt| dt.to_descriptor())
        .map_err(|e| read_err(e))?;
    let ndim = attr.shape().len();
    if ndim > 1 {
        return Err(unsupported(format!("{}-dimensional attribute", ndim)));
    }
    let scalar = ndim == 0;

    macro_rules! value {
        ($t:ty, $make:expr) => {
            if scalar {
                $make(attr.read_scalar::<$t>().map_err(read_err)?)
            } else {
                AttrValue::List(
                    attr.read_raw::<$t>()
                        .map_err(read_err)?
                        .into_iter()
                        .map($make)
                        .collect(),
                )
            }
        };
    }

    Ok(match descriptor {
        TypeDescriptor::Boolean => value!(bool, AttrValue::Bool),
        TypeDescriptor::Integer(_) => value!(i64, AttrValue::Int),
        TypeDescriptor::Unsigned(_) => {
            value!(u64, |v: u64| AttrValue::Int(v as i64))
        }
        TypeDescriptor::Float(_) => value!(f64, AttrValue::Float),
        TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode => {
            value!(VarLenUnicode, |v: VarLenUnicode| AttrValue::Str(
                v.to_string()
            ))
        }
        other => return Err(unsupported(format!("{}", other))),
    })
}
