/*!
 * File Object Mutations
 * Create, delete, copy and selector-driven traversal
 */

use std::io;
use tracing::debug;

use super::FileObject;
use crate::vfs::listener::{FileChangeEvent, FileChangeKind};
use crate::vfs::selector::{FileSelector, SelectInfo, Selectors, TraversalOrder};
use crate::vfs::types::*;

impl FileObject {
    /// Create this folder and any missing ancestors
    ///
    /// No-op when the folder already exists.
    pub fn create_folder(&self) -> VfsResult<()> {
        self.create(FileType::Folder)
    }

    /// Create this file as empty content, plus any missing ancestors
    ///
    /// No-op when the file already exists.
    pub fn create_file(&self) -> VfsResult<()> {
        self.create(FileType::File)
    }

    fn create(&self, wanted: FileType) -> VfsResult<()> {
        self.fs.require(Capability::Create, self.name())?;
        if self.existing_as(wanted)? {
            return Ok(());
        }

        // Ancestors first, without holding this node's lock
        if let Some(parent) = self.parent()? {
            parent.create_folder()?;
        }

        {
            let _guard = self.lock_ops();
            if self.existing_as(wanted)? {
                return Ok(());
            }
            let backend = self.fs.backend();
            let result = match wanted {
                FileType::Folder => backend.create_folder(self.name()),
                _ => backend.create_file(self.name()),
            };
            result.map_err(|e| VfsError::backend("create", self.name(), e))?;
            self.set_state(wanted);
        }

        debug!(name = %self.name(), file_type = %wanted, "created");
        self.notify(FileChangeKind::Created);
        Ok(())
    }

    /// True when this already exists as `wanted`; a conflict for the other kind
    fn existing_as(&self, wanted: FileType) -> VfsResult<bool> {
        match self.file_type()? {
            FileType::Imaginary => Ok(false),
            actual if actual == wanted => Ok(true),
            actual => Err(VfsError::conflict(self.name(), wanted, actual)),
        }
    }

    /// Delete this file and everything beneath it
    ///
    /// Returns the number of files removed; zero when nothing existed.
    pub fn delete(&self) -> VfsResult<usize> {
        self.delete_with(&Selectors::SELECT_ALL)
    }

    /// Delete the selected files, children before their parents
    pub fn delete_with(&self, selector: &dyn FileSelector) -> VfsResult<usize> {
        self.fs.require(Capability::Delete, self.name())?;
        let mut removed = 0;
        for file in self.find_files(selector, TraversalOrder::PostOrder)? {
            if file.delete_self()? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn delete_self(&self) -> VfsResult<bool> {
        {
            let _guard = self.lock_ops();
            let file_type = self.file_type()?;
            if !file_type.exists() {
                return Ok(false);
            }

            let backend = self.fs.backend();
            if file_type == FileType::Folder && self.fs.has_capability(Capability::ListChildren) {
                let remaining = backend
                    .list_children(self.name())
                    .map_err(|e| VfsError::backend("list the children of", self.name(), e))?;
                if !remaining.is_empty() {
                    return Err(VfsError::operation("delete", self.name(), "folder is not empty"));
                }
            }

            backend
                .delete(self.name())
                .map_err(|e| VfsError::backend("delete", self.name(), e))?;
            self.set_state(FileType::Imaginary);
        }

        debug!(name = %self.name(), "deleted");
        self.notify(FileChangeKind::Deleted);
        Ok(true)
    }

    /// Copy the selected part of `source` beneath this file
    ///
    /// Each destination that already exists is deleted before being
    /// materialized again.
    pub fn copy_from(&self, source: &FileObject, selector: &dyn FileSelector) -> VfsResult<()> {
        if source.name().same_root(self.name())
            && (source.name() == self.name()
                || source.name().is_ancestor_of(self.name())
                || self.name().is_ancestor_of(source.name()))
        {
            return Err(VfsError::operation(
                "copy",
                self.name(),
                format!("source {} overlaps the destination", source.name()),
            ));
        }
        if !source.exists()? {
            return Err(VfsError::operation(
                "copy",
                source.name(),
                "source file does not exist",
            ));
        }
        source.fs.require(Capability::ReadContent, source.name())?;
        self.fs.require(Capability::Create, self.name())?;
        self.fs.require(Capability::WriteContent, self.name())?;

        let files = source.find_files(selector, TraversalOrder::PreOrder)?;
        debug!(from = %source.name(), to = %self.name(), files = files.len(), "copying");

        for file in &files {
            let relative = file.name().relative_to(source.name()).unwrap_or_default();
            let dest = if relative.is_empty() {
                self.clone()
            } else {
                self.resolve_file(&relative)?
            };

            if dest.exists()? {
                dest.delete()?;
            }

            match file.file_type()? {
                FileType::File => {
                    let mut input = file.content().input_stream()?;
                    let mut output = dest.content().output_stream()?;
                    io::copy(&mut input, &mut output)
                        .map_err(|e| VfsError::backend("copy content to", dest.name(), e))?;
                    output.finish()?;
                }
                FileType::Folder => dest.create_folder()?,
                FileType::Imaginary => {}
            }
        }
        Ok(())
    }

    /// Depth-first search beneath this file
    ///
    /// Only folders are descended. A nonexistent base yields nothing.
    pub fn find_files(
        &self,
        selector: &dyn FileSelector,
        order: TraversalOrder,
    ) -> VfsResult<Vec<FileObject>> {
        let mut selected = Vec::new();
        if self.exists()? {
            self.traverse(self, 0, selector, order, &mut selected)?;
        }
        Ok(selected)
    }

    fn traverse(
        &self,
        base: &FileObject,
        depth: usize,
        selector: &dyn FileSelector,
        order: TraversalOrder,
        selected: &mut Vec<FileObject>,
    ) -> VfsResult<()> {
        let info = SelectInfo::new(base, self, depth);
        let position = selected.len();

        if self.file_type()?.has_children() && selector.traverse_descendants(&info)? {
            for child in self.children()? {
                child.traverse(base, depth + 1, selector, order, selected)?;
            }
        }

        if selector.include_file(&info)? {
            match order {
                TraversalOrder::PreOrder => selected.insert(position, self.clone()),
                TraversalOrder::PostOrder => selected.push(self.clone()),
            }
        }
        Ok(())
    }

    pub(crate) fn notify(&self, kind: FileChangeKind) {
        self.fs.fire(&FileChangeEvent::new(self.clone(), kind));
    }
}
