/*!
 * Layer Chains & Resource Search Paths
 *
 * Walking a layered filesystem back to the files it was opened from, and
 * locating named resources across an ordered list of folders and archives.
 */

use std::sync::Arc;
use tracing::{debug, warn};

use super::filesystem::FileSystem;
use super::manager::FileSystemManager;
use super::object::FileObject;
use super::traits::Certificate;
use super::types::*;

/// Manifest attribute marking a package as sealed
pub const SEALED_ATTRIBUTE: &str = "Sealed";

/// A filesystem followed by the filesystems of its parent layers
pub struct LayerChain {
    next: Option<Arc<FileSystem>>,
}

impl LayerChain {
    pub fn new(fs: &Arc<FileSystem>) -> Self {
        Self {
            next: Some(Arc::clone(fs)),
        }
    }

    pub fn of(file: &FileObject) -> Self {
        Self::new(file.file_system())
    }
}

impl Iterator for LayerChain {
    type Item = Arc<FileSystem>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current
            .parent_layer()
            .map(|layer| Arc::clone(layer.file_system()));
        Some(current)
    }
}

/// Apply `f` to `file` and then to every parent-layer file up the chain
pub fn aggregate_layer_metadata<T, F>(file: &FileObject, mut f: F) -> VfsResult<Vec<T>>
where
    F: FnMut(&FileObject) -> VfsResult<T>,
{
    let mut collected = vec![f(file)?];
    let mut layer = file.file_system().parent_layer().cloned();
    while let Some(parent) = layer {
        collected.push(f(&parent)?);
        layer = parent.file_system().parent_layer().cloned();
    }
    Ok(collected)
}

/// A located resource and the search root it was found under
#[derive(Debug, Clone)]
pub struct Resource {
    root: FileObject,
    file: FileObject,
}

impl Resource {
    /// Search-path entry the resource was found through
    pub fn root(&self) -> &FileObject {
        &self.root
    }

    pub fn file(&self) -> &FileObject {
        &self.file
    }

    pub fn url(&self) -> &str {
        self.file.url()
    }

    pub fn bytes(&self) -> VfsResult<Vec<u8>> {
        self.file.content().read_to_vec()
    }

    /// Attributes of the folder holding the resource (manifest fields)
    ///
    /// Empty when the filesystem does not expose attributes.
    pub fn package_attributes(&self) -> VfsResult<Attributes> {
        let Some(parent) = self.file.parent()? else {
            return Ok(Attributes::new());
        };
        if !parent.file_system().has_capability(Capability::GetAttributes) {
            return Ok(Attributes::new());
        }
        parent.content().attributes()
    }

    /// Whether the holding package is declared sealed
    pub fn is_sealed(&self) -> VfsResult<bool> {
        Ok(self
            .package_attributes()?
            .get(SEALED_ATTRIBUTE)
            .is_some_and(|value| value.eq_ignore_ascii_case("true")))
    }

    /// Certificates of the resource and of every parent layer
    pub fn layer_certificates(&self) -> VfsResult<Vec<Certificate>> {
        let per_layer = aggregate_layer_metadata(&self.file, |file| {
            if file.file_system().has_capability(Capability::Signing) && file.is_file()? {
                file.content().certificates()
            } else {
                Ok(Vec::new())
            }
        })?;
        Ok(per_layer.into_iter().flatten().collect())
    }
}

/// Ordered list of folders and archives searched for named resources
///
/// Folder roots are searched directly. File roots are opened with the
/// archive scheme and searched inside.
#[derive(Debug, Clone)]
pub struct ResourceSearchPath {
    manager: FileSystemManager,
    roots: Vec<FileObject>,
    archive_scheme: String,
}

impl ResourceSearchPath {
    pub fn new(manager: &FileSystemManager, roots: Vec<FileObject>) -> Self {
        Self {
            archive_scheme: manager.config().archive_scheme.clone(),
            manager: manager.clone(),
            roots,
        }
    }

    pub fn with_archive_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.archive_scheme = scheme.into();
        self
    }

    pub fn push(&mut self, root: FileObject) {
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[FileObject] {
        &self.roots
    }

    pub fn archive_scheme(&self) -> &str {
        &self.archive_scheme
    }

    /// First match for `name` in search order
    pub fn find(&self, name: &str) -> Option<Resource> {
        self.roots.iter().find_map(|root| self.search(root, name))
    }

    /// Every match for `name`, in search order
    pub fn find_all(&self, name: &str) -> Vec<Resource> {
        self.roots
            .iter()
            .filter_map(|root| self.search(root, name))
            .collect()
    }

    fn search(&self, root: &FileObject, name: &str) -> Option<Resource> {
        match self.lookup(root, name) {
            Ok(Some(file)) => {
                debug!(resource = name, found = %file.name(), "resource located");
                Some(Resource {
                    root: root.clone(),
                    file,
                })
            }
            Ok(None) => None,
            Err(err) => {
                warn!(root = %root.name(), resource = name, error = %err, "skipping search root");
                None
            }
        }
    }

    fn lookup(&self, root: &FileObject, name: &str) -> VfsResult<Option<FileObject>> {
        let base = match root.file_type()? {
            FileType::Folder => root.clone(),
            FileType::File => self.manager.create_file_system(&self.archive_scheme, root)?,
            FileType::Imaginary => return Ok(None),
        };
        let file = base.resolve_file(name.trim_start_matches('/'))?;
        Ok(file.exists()?.then_some(file))
    }
}
