//! In-memory store backend.
//!
//! Backs unit and integration tests without touching libhdf5, and doubles as
//! a fixture builder for tooling. Nodes live in a path-keyed arena; soft
//! links are first-class nodes resolved (with cycle protection) on access,
//! mirroring how the native backend resolves links by path rather than by
//! pointer.
//!
//! Every `read_rows` call is counted per dataset path, so tests can assert
//! that projection pushdown never touches unrequested datasets.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::attr::AttrValue;
use crate::error::{Result, StoreError};
use crate::store::{AttrMap, Dataset, ElementKind, Group, Node, SliceData};

#[derive(Debug, Clone)]
enum MemNode {
    Group { attrs: AttrMap },
    Dataset(MemDataset),
    Link { target: String },
}

#[derive(Debug, Clone)]
struct MemDataset {
    shape: Vec<usize>,
    data: SliceData,
    attrs: AttrMap,
}

struct Inner {
    nodes: Mutex<BTreeMap<String, MemNode>>,
    reads: Mutex<BTreeMap<String, u64>>,
}

/// An in-memory hierarchical array store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store containing only the root group.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::new(),
            MemNode::Group {
                attrs: AttrMap::new(),
            },
        );
        Self {
            inner: Arc::new(Inner {
                nodes: Mutex::new(nodes),
                reads: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Add a group at `path`, creating missing parents.
    pub fn add_group(&self, path: &str) {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.inner.nodes.lock().unwrap().insert(
            path,
            MemNode::Group {
                attrs: AttrMap::new(),
            },
        );
    }

    /// Add a dataset at `path` with the given shape and flat row-major data,
    /// creating missing parent groups.
    pub fn add_dataset(&self, path: &str, shape: &[usize], data: SliceData) {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.inner.nodes.lock().unwrap().insert(
            path,
            MemNode::Dataset(MemDataset {
                shape: shape.to_vec(),
                data,
                attrs: AttrMap::new(),
            }),
        );
    }

    /// Add a soft link at `path` pointing at `target` (another path).
    pub fn add_link(&self, path: &str, target: &str) {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.inner.nodes.lock().unwrap().insert(
            path,
            MemNode::Link {
                target: normalize(target),
            },
        );
    }

    /// Set an attribute on an existing group or dataset.
    ///
    /// # Panics
    ///
    /// Panics if no node exists at `path` (fixture-construction misuse).
    pub fn set_attr(&self, path: &str, name: &str, value: AttrValue) {
        let path = normalize(path);
        let mut nodes = self.inner.nodes.lock().unwrap();
        match nodes.get_mut(&path) {
            Some(MemNode::Group { attrs }) | Some(MemNode::Dataset(MemDataset { attrs, .. })) => {
                attrs.insert(name.to_string(), value);
            }
            _ => panic!("no node at {:?}", path),
        }
    }

    /// The root group of the store.
    pub fn root(&self) -> Arc<dyn Group> {
        Arc::new(MemGroup {
            inner: Arc::clone(&self.inner),
            path: String::new(),
        })
    }

    /// Resolve a group by path.
    pub fn group(&self, path: &str) -> Result<Arc<dyn Group>> {
        self.root().group(path)
    }

    /// Number of `read_rows` calls issued against the dataset at `path`.
    pub fn read_count(&self, path: &str) -> u64 {
        self.inner
            .reads
            .lock()
            .unwrap()
            .get(&normalize(path))
            .copied()
            .unwrap_or(0)
    }

    fn ensure_parents(&self, path: &str) {
        let Some((parents, _)) = path.rsplit_once('/') else {
            return;
        };
        let mut nodes = self.inner.nodes.lock().unwrap();
        let mut prefix = String::new();
        for part in parents.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            nodes.entry(prefix.clone()).or_insert(MemNode::Group {
                attrs: AttrMap::new(),
            });
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn join(base: &str, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else if relative.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, relative)
    }
}

impl Inner {
    /// Follow link nodes until a real node is reached. Returns the resolved
    /// path and node. Cycles and dangling targets are `BadLink` errors.
    fn resolve(&self, path: &str) -> Result<(String, MemNode)> {
        let nodes = self.nodes.lock().unwrap();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = path.to_string();
        loop {
            let node = nodes
                .get(&current)
                .ok_or_else(|| StoreError::not_found(current.clone()))?;
            match node {
                MemNode::Link { target } => {
                    if !visited.insert(current.clone()) {
                        return Err(StoreError::BadLink {
                            path: path.to_string(),
                            target: target.clone(),
                        });
                    }
                    current = target.clone();
                }
                other => return Ok((current, other.clone())),
            }
        }
    }

    fn wrap(self: &Arc<Self>, path: String, node: MemNode) -> Node {
        match node {
            MemNode::Group { .. } => Node::Group(Arc::new(MemGroup {
                inner: Arc::clone(self),
                path,
            })),
            MemNode::Dataset(ds) => Node::Dataset(Arc::new(MemDatasetHandle {
                inner: Arc::clone(self),
                path,
                shape: ds.shape,
                kind: ds.data.element_kind(),
            })),
            MemNode::Link { .. } => unreachable!("links are resolved before wrapping"),
        }
    }
}

struct MemGroup {
    inner: Arc<Inner>,
    path: String,
}

impl Group for MemGroup {
    fn path(&self) -> &str {
        &self.path
    }

    fn children(&self) -> Result<Vec<(String, Node)>> {
        let child_names: Vec<String> = {
            let nodes = self.inner.nodes.lock().unwrap();
            let prefix = if self.path.is_empty() {
                String::new()
            } else {
                format!("{}/", self.path)
            };
            nodes
                .keys()
                .filter(|k| !k.is_empty() && k.starts_with(&prefix))
                .filter_map(|k| {
                    let rest = &k[prefix.len()..];
                    (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
                })
                .collect()
        };

        let mut children = Vec::with_capacity(child_names.len());
        for name in child_names {
            let abs = join(&self.path, &name);
            let (resolved, node) = self.inner.resolve(&abs)?;
            children.push((name, self.inner.wrap(resolved, node)));
        }
        Ok(children)
    }

    fn node(&self, relative: &str) -> Result<Node> {
        let abs = join(&self.path, relative);
        let (resolved, node) = self.inner.resolve(&abs)?;
        Ok(self.inner.wrap(resolved, node))
    }

    fn dataset(&self, relative: &str) -> Result<Arc<dyn Dataset>> {
        match self.node(relative)? {
            Node::Dataset(ds) => Ok(ds),
            Node::Group(_) => Err(StoreError::wrong_kind(
                join(&self.path, relative),
                "dataset",
            )),
        }
    }

    fn group(&self, relative: &str) -> Result<Arc<dyn Group>> {
        match self.node(relative)? {
            Node::Group(g) => Ok(g),
            Node::Dataset(_) => Err(StoreError::wrong_kind(join(&self.path, relative), "group")),
        }
    }

    fn attributes(&self) -> Result<AttrMap> {
        match self.inner.resolve(&self.path)? {
            (_, MemNode::Group { attrs }) => Ok(attrs),
            _ => Err(StoreError::wrong_kind(self.path.clone(), "group")),
        }
    }
}

struct MemDatasetHandle {
    inner: Arc<Inner>,
    path: String,
    shape: Vec<usize>,
    kind: ElementKind,
}

impl Dataset for MemDatasetHandle {
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
        match self.inner.resolve(&self.path)? {
            (_, MemNode::Dataset(ds)) => Ok(ds.attrs),
            _ => Err(StoreError::wrong_kind(self.path.clone(), "dataset")),
        }
    }

    fn read_rows(&self, start: usize, stop: usize) -> Result<SliceData> {
        *self
            .inner
            .reads
            .lock()
            .unwrap()
            .entry(self.path.clone())
            .or_insert(0) += 1;

        let (_, node) = self.inner.resolve(&self.path)?;
        let MemNode::Dataset(ds) = node else {
            return Err(StoreError::wrong_kind(self.path.clone(), "dataset"));
        };

        let row_width: usize = ds.shape.iter().skip(1).product();
        let from = (start * row_width).min(ds.data.len());
        let to = (stop * row_width).min(ds.data.len());

        macro_rules! slice {
            ($variant:ident, $v:expr) => {
                SliceData::$variant($v[from..to].to_vec())
            };
        }
        Ok(match &ds.data {
            SliceData::Bool(v) => slice!(Bool, v),
            SliceData::Int8(v) => slice!(Int8, v),
            SliceData::Int16(v) => slice!(Int16, v),
            SliceData::Int32(v) => slice!(Int32, v),
            SliceData::Int64(v) => slice!(Int64, v),
            SliceData::Uint8(v) => slice!(Uint8, v),
            SliceData::Uint16(v) => slice!(Uint16, v),
            SliceData::Uint32(v) => slice!(Uint32, v),
            SliceData::Uint64(v) => slice!(Uint64, v),
            SliceData::Float32(v) => slice!(Float32, v),
            SliceData::Float64(v) => slice!(Float64, v),
            SliceData::Str(v) => slice!(Str, v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_dataset("group/group_ds", &[4], SliceData::Float64(vec![0.0, 1.0, 2.0, 3.0]));
        store.add_dataset(
            "group/subgroup/subgroup_ds",
            &[4],
            SliceData::Int64(vec![10, 11, 12, 13]),
        );
        store.add_link("group/linked", "group/subgroup/subgroup_ds");
        store
    }

    #[test]
    fn test_children_resolve_links_in_order() {
        let store = sample_store();
        let group = store.group("group").unwrap();
        let children = group.children().unwrap();
        let names: Vec<&str> = children.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["group_ds", "linked", "subgroup"]);

        // The link resolves to the target dataset but keeps its own name.
        match &children[1].1 {
            Node::Dataset(ds) => assert_eq!(ds.path(), "group/subgroup/subgroup_ds"),
            Node::Group(_) => panic!("linked should resolve to a dataset"),
        }
    }

    #[test]
    fn test_dataset_lookup_by_nested_path() {
        let store = sample_store();
        let root = store.root();
        let ds = root.dataset("group/subgroup/subgroup_ds").unwrap();
        assert_eq!(ds.shape(), &[4]);
        assert_eq!(ds.element_kind(), ElementKind::Int64);
    }

    #[test]
    fn test_missing_node_is_not_found() {
        let store = sample_store();
        let err = store.root().dataset("group/absent").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_group_where_dataset_expected() {
        let store = sample_store();
        let err = store.root().dataset("group/subgroup").unwrap_err();
        assert!(matches!(err, StoreError::WrongKind { .. }));
    }

    #[test]
    fn test_dangling_link() {
        let store = MemoryStore::new();
        store.add_link("broken", "nowhere");
        let err = store.root().node("broken").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_link_cycle() {
        let store = MemoryStore::new();
        store.add_link("a", "b");
        store.add_link("b", "a");
        let err = store.root().node("a").unwrap_err();
        assert!(matches!(err, StoreError::BadLink { .. }));
    }

    #[test]
    fn test_read_rows_slices_and_clamps() {
        let store = sample_store();
        let ds = store.root().dataset("group/group_ds").unwrap();
        assert_eq!(
            ds.read_rows(1, 3).unwrap(),
            SliceData::Float64(vec![1.0, 2.0])
        );
        // Reading past the end clamps to the final row.
        assert_eq!(
            ds.read_rows(3, 10).unwrap(),
            SliceData::Float64(vec![3.0])
        );
    }

    #[test]
    fn test_read_rows_flattens_trailing_dims() {
        let store = MemoryStore::new();
        store.add_dataset(
            "two_d",
            &[2, 3],
            SliceData::Int32(vec![0, 1, 2, 3, 4, 5]),
        );
        let ds = store.root().dataset("two_d").unwrap();
        assert_eq!(ds.rows(), 2);
        assert_eq!(
            ds.read_rows(1, 2).unwrap(),
            SliceData::Int32(vec![3, 4, 5])
        );
    }

    #[test]
    fn test_read_counters() {
        let store = sample_store();
        let ds = store.root().dataset("group/group_ds").unwrap();
        assert_eq!(store.read_count("group/group_ds"), 0);
        ds.read_rows(0, 2).unwrap();
        ds.read_rows(2, 4).unwrap();
        assert_eq!(store.read_count("group/group_ds"), 2);
        assert_eq!(store.read_count("group/subgroup/subgroup_ds"), 0);
    }

    #[test]
    fn test_attributes() {
        let store = sample_store();
        store.set_attr("group/group_ds", "units", AttrValue::from("m"));
        let ds = store.root().dataset("group/group_ds").unwrap();
        let attrs = ds.attributes().unwrap();
        assert_eq!(attrs.get("units"), Some(&AttrValue::from("m")));
    }
}
