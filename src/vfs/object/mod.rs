/*!
 * File Objects
 * Handles to one name within one filesystem
 *
 * A handle is a filesystem reference plus a shared node. The node carries
 * the cached type and serializes mutations; the filesystem cache decides
 * whether equal names share a node.
 */

mod content;
mod ops;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use super::filesystem::FileSystem;
use super::name::{self, Name};
use super::types::*;

pub use content::{ContentWriter, FileContent};

/// Shared per-name state
pub(crate) struct Node {
    name: Name,
    /// `None` until first queried or after `refresh`
    state: Mutex<Option<FileType>>,
    /// Held across one backend mutation; re-entrant for listener callbacks
    op_lock: ReentrantMutex<()>,
}

impl Node {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            state: Mutex::new(None),
            op_lock: ReentrantMutex::new(()),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }
}

/// Handle to a file or folder
///
/// Cloning is cheap. Two handles are equal when they share a node, which is
/// the case for equal names resolved through a caching filesystem.
#[derive(Clone)]
pub struct FileObject {
    fs: Arc<FileSystem>,
    node: Arc<Node>,
}

impl FileObject {
    pub(crate) fn new(fs: Arc<FileSystem>, node: Arc<Node>) -> Self {
        Self { fs, node }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        self.node.name()
    }

    /// Canonical URI string of this file
    #[inline]
    pub fn url(&self) -> &str {
        self.node.name().uri()
    }

    #[inline]
    pub fn file_system(&self) -> &Arc<FileSystem> {
        &self.fs
    }

    /// True when both handles share the same node
    pub fn ptr_eq(&self, other: &FileObject) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Current type, queried from the backend on first use
    pub fn file_type(&self) -> VfsResult<FileType> {
        if let Some(file_type) = *self.node.state.lock() {
            return Ok(file_type);
        }
        let file_type = self
            .fs
            .backend()
            .file_type(self.name())
            .map_err(|e| VfsError::backend("determine the type of", self.name(), e))?;
        trace!(name = %self.name(), %file_type, "attached file");
        Ok(*self.node.state.lock().get_or_insert(file_type))
    }

    pub fn exists(&self) -> VfsResult<bool> {
        Ok(self.file_type()?.exists())
    }

    pub fn is_file(&self) -> VfsResult<bool> {
        Ok(self.file_type()? == FileType::File)
    }

    pub fn is_folder(&self) -> VfsResult<bool> {
        Ok(self.file_type()? == FileType::Folder)
    }

    /// Forget the cached type; the next query asks the backend again
    pub fn refresh(&self) {
        *self.node.state.lock() = None;
    }

    /// Parent folder, `None` at the filesystem root
    pub fn parent(&self) -> VfsResult<Option<FileObject>> {
        match self.name().parent() {
            Some(parent) => self.fs.resolve_file(&parent).map(Some),
            None => Ok(None),
        }
    }

    /// Direct children, sorted by base name
    pub fn children(&self) -> VfsResult<Vec<FileObject>> {
        let mut names = self.child_names()?;
        names.sort_unstable();
        names
            .iter()
            .map(|base| {
                let child = self.name().child(base)?;
                self.fs.resolve_file(&child)
            })
            .collect()
    }

    /// Direct child with the given base name, `None` when absent
    pub fn child(&self, base_name: &str) -> VfsResult<Option<FileObject>> {
        let names = self.child_names()?;
        if !names.iter().any(|n| n == base_name) {
            return Ok(None);
        }
        let child = self.name().child(base_name)?;
        self.fs.resolve_file(&child).map(Some)
    }

    fn child_names(&self) -> VfsResult<Vec<String>> {
        self.fs.require(Capability::ListChildren, self.name())?;
        let file_type = self.file_type()?;
        if file_type != FileType::Folder {
            return Err(VfsError::conflict(self.name(), FileType::Folder, file_type));
        }
        self.fs
            .backend()
            .list_children(self.name())
            .map_err(|e| VfsError::backend("list the children of", self.name(), e))
    }

    /// Resolve `path` relative to this file, treated as a folder
    ///
    /// Scheme-qualified strings are handed to the owning manager.
    pub fn resolve_file(&self, path: &str) -> VfsResult<FileObject> {
        if name::has_scheme(path) {
            let manager = self.fs.manager().ok_or_else(|| {
                VfsError::provider_creation(self.fs.provider_id(), "file system manager is gone")
            })?;
            return manager.resolve_file(Some(self), path);
        }
        let name = self.name().resolve(path)?;
        self.fs.resolve_file(&name)
    }

    /// Content surface of this file
    pub fn content(&self) -> FileContent {
        FileContent::new(self.clone())
    }

    pub(crate) fn set_state(&self, file_type: FileType) {
        *self.node.state.lock() = Some(file_type);
    }

    pub(crate) fn lock_ops(&self) -> ReentrantMutexGuard<'_, ()> {
        self.node.op_lock.lock()
    }
}

impl PartialEq for FileObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for FileObject {}

impl fmt::Debug for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FileObject")
            .field("name", self.name())
            .field("state", &*self.node.state.lock())
            .finish()
    }
}

impl fmt::Display for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.name(), f)
    }
}
