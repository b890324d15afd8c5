/*!
 * In-Memory Backend
 * Fast, volatile backend for tests and scratch filesystems
 */

mod file_handle;
mod node;

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::time::SystemTime;

use super::name::Name;
use super::object::FileObject;
use super::traits::{Backend, Certificate, FileProvider, RandomAccessContent, RandomAccessMode};
use super::types::*;
use file_handle::MemRandomAccess;
use node::MemNode;

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path))
}

fn not_a_file(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("not a file: {}", path))
}

fn not_a_folder(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("not a folder: {}", path))
}

fn parent_path(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}

/// In-memory backend keyed by absolute path
///
/// Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemBackend {
    nodes: Arc<DashMap<String, MemNode, RandomState>>,
    /// Serializes structural changes so parents and children stay consistent
    structure: Arc<Mutex<()>>,
    capabilities: CapabilitySet,
}

impl MemBackend {
    /// Backend declaring every capability except `Signing`
    pub fn new() -> Self {
        Self::with_capabilities(CapabilitySet::all().without(Capability::Signing))
    }

    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        let nodes = DashMap::with_hasher(RandomState::new());
        nodes.insert("/".to_string(), MemNode::folder());
        Self {
            nodes: Arc::new(nodes),
            structure: Arc::new(Mutex::new(())),
            capabilities,
        }
    }

    /// Number of files and folders, the root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Set one attribute of an existing node
    pub fn set_attribute(
        &self,
        path: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> io::Result<()> {
        let mut node = self.nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.attributes_mut().insert(key.into(), value.into());
        Ok(())
    }

    /// Replace the certificates of an existing file
    pub fn set_certificates(&self, path: &str, certs: Vec<Certificate>) -> io::Result<()> {
        let mut node = self.nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        match node.value_mut() {
            MemNode::File { certificates, .. } => {
                *certificates = certs;
                Ok(())
            }
            MemNode::Folder { .. } => Err(not_a_file(path)),
        }
    }

    fn create(&self, name: &Name, node: MemNode) -> io::Result<()> {
        let path = name.path();
        let (parent, base) = parent_path(&path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::AlreadyExists, "the root always exists")
        })?;

        let _structure = self.structure.lock();
        if self.nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {}", path),
            ));
        }
        match self.nodes.get_mut(parent).as_deref_mut() {
            Some(MemNode::Folder { children, modified, .. }) => {
                children.insert(base.to_string());
                *modified = SystemTime::now();
            }
            Some(MemNode::File { .. }) => return Err(not_a_folder(parent)),
            None => return Err(not_found(parent)),
        }
        self.nodes.insert(path, node);
        Ok(())
    }

    fn update_file(&self, name: &Name, f: impl FnOnce(&mut Vec<u8>)) -> io::Result<()> {
        let path = name.path();
        let mut node = self.nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        match node.value_mut() {
            MemNode::File { data, modified, .. } => {
                f(data);
                *modified = SystemTime::now();
                Ok(())
            }
            MemNode::Folder { .. } => Err(not_a_file(&path)),
        }
    }

    fn file_data(&self, name: &Name) -> io::Result<Vec<u8>> {
        let path = name.path();
        let node = self.nodes.get(&path).ok_or_else(|| not_found(&path))?;
        match node.value() {
            MemNode::File { data, .. } => Ok(data.clone()),
            MemNode::Folder { .. } => Err(not_a_file(&path)),
        }
    }
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemBackend {
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn file_type(&self, name: &Name) -> io::Result<FileType> {
        Ok(self
            .nodes
            .get(&name.path())
            .map_or(FileType::Imaginary, |node| node.file_type()))
    }

    fn list_children(&self, name: &Name) -> io::Result<Vec<String>> {
        let path = name.path();
        let node = self.nodes.get(&path).ok_or_else(|| not_found(&path))?;
        match node.value() {
            MemNode::Folder { children, .. } => Ok(children.iter().cloned().collect()),
            MemNode::File { .. } => Err(not_a_folder(&path)),
        }
    }

    fn create_folder(&self, name: &Name) -> io::Result<()> {
        self.create(name, MemNode::folder())
    }

    fn create_file(&self, name: &Name) -> io::Result<()> {
        self.create(name, MemNode::file())
    }

    fn delete(&self, name: &Name) -> io::Result<()> {
        let path = name.path();
        let (parent, base) = parent_path(&path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::PermissionDenied, "the root cannot be deleted")
        })?;

        let _structure = self.structure.lock();
        {
            let node = self.nodes.get(&path).ok_or_else(|| not_found(&path))?;
            if let MemNode::Folder { children, .. } = node.value() {
                if !children.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("folder is not empty: {}", path),
                    ));
                }
            }
        }
        self.nodes.remove(&path);
        if let Some(MemNode::Folder { children, modified, .. }) =
            self.nodes.get_mut(parent).as_deref_mut()
        {
            children.remove(base);
            *modified = SystemTime::now();
        }
        Ok(())
    }

    fn read(&self, name: &Name) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.file_data(name)?)))
    }

    fn write(&self, name: &Name, content: &[u8]) -> io::Result<()> {
        self.update_file(name, |data| {
            data.clear();
            data.extend_from_slice(content);
        })
    }

    fn append(&self, name: &Name, content: &[u8]) -> io::Result<()> {
        self.update_file(name, |data| data.extend_from_slice(content))
    }

    fn random_access(
        &self,
        name: &Name,
        mode: RandomAccessMode,
    ) -> io::Result<Box<dyn RandomAccessContent>> {
        Ok(Box::new(MemRandomAccess {
            nodes: Arc::clone(&self.nodes),
            path: name.path(),
            cursor: Cursor::new(self.file_data(name)?),
            mode,
            dirty: false,
        }))
    }

    fn size(&self, name: &Name) -> io::Result<u64> {
        let path = name.path();
        let node = self.nodes.get(&path).ok_or_else(|| not_found(&path))?;
        match node.value() {
            MemNode::File { data, .. } => Ok(data.len() as u64),
            MemNode::Folder { .. } => Err(not_a_file(&path)),
        }
    }

    fn last_modified(&self, name: &Name) -> io::Result<SystemTime> {
        let path = name.path();
        self.nodes
            .get(&path)
            .map(|node| node.modified())
            .ok_or_else(|| not_found(&path))
    }

    fn set_last_modified(&self, name: &Name, time: SystemTime) -> io::Result<()> {
        let path = name.path();
        let mut node = self.nodes.get_mut(&path).ok_or_else(|| not_found(&path))?;
        node.set_modified(time);
        Ok(())
    }

    fn attributes(&self, name: &Name) -> io::Result<Attributes> {
        let path = name.path();
        self.nodes
            .get(&path)
            .map(|node| node.attributes().clone())
            .ok_or_else(|| not_found(&path))
    }

    fn certificates(&self, name: &Name) -> io::Result<Vec<Certificate>> {
        let path = name.path();
        let node = self.nodes.get(&path).ok_or_else(|| not_found(&path))?;
        match node.value() {
            MemNode::File { certificates, .. } => Ok(certificates.clone()),
            MemNode::Folder { .. } => Ok(Vec::new()),
        }
    }
}

/// Provider opening one `MemBackend` per root name
///
/// Keeps every backend it opened so tests can reach behind the filesystem.
pub struct MemProvider {
    capabilities: CapabilitySet,
    backends: DashMap<Name, MemBackend, RandomState>,
}

impl MemProvider {
    pub fn new() -> Self {
        Self::with_capabilities(CapabilitySet::all().without(Capability::Signing))
    }

    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities,
            backends: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Backend opened for `root`, if any
    pub fn backend(&self, root: &Name) -> Option<MemBackend> {
        self.backends.get(root).map(|b| b.value().clone())
    }
}

impl Default for MemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FileProvider for MemProvider {
    fn id(&self) -> &str {
        "mem"
    }

    fn open(&self, root: &Name, _parent_layer: Option<&FileObject>) -> VfsResult<Arc<dyn Backend>> {
        let backend = self
            .backends
            .entry(root.clone())
            .or_insert_with(|| MemBackend::with_capabilities(self.capabilities))
            .value()
            .clone();
        Ok(Arc::new(backend))
    }
}
