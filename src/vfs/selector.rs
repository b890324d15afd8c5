/*!
 * File Selectors
 * Traversal policies for recursive find, delete and copy
 */

use super::object::FileObject;
use super::types::{FileType, VfsResult};

/// Position of a visited file within a traversal
#[derive(Debug, Clone, Copy)]
pub struct SelectInfo<'a> {
    base: &'a FileObject,
    file: &'a FileObject,
    depth: usize,
}

impl<'a> SelectInfo<'a> {
    pub(crate) fn new(base: &'a FileObject, file: &'a FileObject, depth: usize) -> Self {
        Self { base, file, depth }
    }

    /// File the traversal started from
    pub fn base(&self) -> &'a FileObject {
        self.base
    }

    /// File currently being visited
    pub fn file(&self) -> &'a FileObject {
        self.file
    }

    /// Distance from the base; the base itself is depth 0
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Order in which a traversal reports selected files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Parents before their children
    #[default]
    PreOrder,
    /// Children before their parents
    PostOrder,
}

/// Decides which files a recursive operation visits
pub trait FileSelector: Send + Sync {
    /// Whether `info.file()` belongs in the result
    fn include_file(&self, info: &SelectInfo<'_>) -> VfsResult<bool>;

    /// Whether to descend into the children of the folder `info.file()`
    fn traverse_descendants(&self, info: &SelectInfo<'_>) -> VfsResult<bool>;
}

/// Selects every file whose depth lies in `min..=max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSelector {
    min: usize,
    max: usize,
}

impl DepthSelector {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub const fn min(&self) -> usize {
        self.min
    }

    pub const fn max(&self) -> usize {
        self.max
    }
}

impl FileSelector for DepthSelector {
    fn include_file(&self, info: &SelectInfo<'_>) -> VfsResult<bool> {
        Ok(info.depth() >= self.min && info.depth() <= self.max)
    }

    fn traverse_descendants(&self, info: &SelectInfo<'_>) -> VfsResult<bool> {
        Ok(info.depth() < self.max)
    }
}

/// Selects every file of one type, at any depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSelector {
    file_type: FileType,
}

impl TypeSelector {
    pub const fn new(file_type: FileType) -> Self {
        Self { file_type }
    }
}

impl FileSelector for TypeSelector {
    fn include_file(&self, info: &SelectInfo<'_>) -> VfsResult<bool> {
        Ok(info.file().file_type()? == self.file_type)
    }

    fn traverse_descendants(&self, _info: &SelectInfo<'_>) -> VfsResult<bool> {
        Ok(true)
    }
}

/// Stock selectors
pub struct Selectors;

impl Selectors {
    /// Only the base file
    pub const SELECT_SELF: DepthSelector = DepthSelector::new(0, 0);
    /// The base file and all its descendants
    pub const SELECT_ALL: DepthSelector = DepthSelector::new(0, usize::MAX);
    /// All descendants, but not the base file
    pub const EXCLUDE_SELF: DepthSelector = DepthSelector::new(1, usize::MAX);
    /// Direct children only
    pub const SELECT_CHILDREN: DepthSelector = DepthSelector::new(1, 1);
    pub const SELECT_SELF_AND_CHILDREN: DepthSelector = DepthSelector::new(0, 1);
    /// Every file (not folder), including the base
    pub const SELECT_FILES: TypeSelector = TypeSelector::new(FileType::File);
    /// Every folder, including the base
    pub const SELECT_FOLDERS: TypeSelector = TypeSelector::new(FileType::Folder);
}
