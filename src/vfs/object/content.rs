/*!
 * File Content
 * Streams, random access, attributes and timestamps of a file
 */

use std::io::{self, Read, Write};
use std::time::SystemTime;
use tracing::{debug, warn};

use super::FileObject;
use crate::vfs::traits::{Certificate, RandomAccessContent, RandomAccessMode};
use crate::vfs::types::*;

/// Content surface of one file
#[derive(Debug, Clone)]
pub struct FileContent {
    file: FileObject,
}

impl FileContent {
    pub(crate) fn new(file: FileObject) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &FileObject {
        &self.file
    }

    fn require(&self, capability: Capability) -> VfsResult<()> {
        self.file.fs.require(capability, self.file.name())
    }

    /// Fails unless the file exists as a file
    fn require_file(&self) -> VfsResult<()> {
        match self.file.file_type()? {
            FileType::File => Ok(()),
            actual => Err(VfsError::conflict(self.file.name(), FileType::File, actual)),
        }
    }

    /// Content size in bytes
    pub fn size(&self) -> VfsResult<u64> {
        self.require_file()?;
        self.file
            .fs
            .backend()
            .size(self.file.name())
            .map_err(|e| VfsError::backend("get the size of", self.file.name(), e))
    }

    /// Sequential reader over the content
    pub fn input_stream(&self) -> VfsResult<Box<dyn Read + Send>> {
        self.require(Capability::ReadContent)?;
        self.require_file()?;
        self.file
            .fs
            .backend()
            .read(self.file.name())
            .map_err(|e| VfsError::backend("read", self.file.name(), e))
    }

    pub fn read_to_vec(&self) -> VfsResult<Vec<u8>> {
        let mut data = Vec::new();
        self.input_stream()?
            .read_to_end(&mut data)
            .map_err(|e| VfsError::backend("read", self.file.name(), e))?;
        Ok(data)
    }

    /// Writer replacing the content once finished
    ///
    /// A nonexistent file is created (with its create event) before the
    /// writer is returned.
    pub fn output_stream(&self) -> VfsResult<ContentWriter> {
        self.require(Capability::WriteContent)?;
        self.prepare_for_write()?;
        Ok(ContentWriter::new(self.file.clone(), WriteMode::Replace))
    }

    /// Writer appending to the content once finished
    pub fn append_stream(&self) -> VfsResult<ContentWriter> {
        self.require(Capability::AppendContent)?;
        self.prepare_for_write()?;
        Ok(ContentWriter::new(self.file.clone(), WriteMode::Append))
    }

    fn prepare_for_write(&self) -> VfsResult<()> {
        match self.file.file_type()? {
            FileType::File => Ok(()),
            FileType::Imaginary => self.file.create_file(),
            FileType::Folder => Err(VfsError::conflict(
                self.file.name(),
                FileType::File,
                FileType::Folder,
            )),
        }
    }

    /// Replace the content with `data`
    pub fn write_all(&self, data: &[u8]) -> VfsResult<()> {
        let mut writer = self.output_stream()?;
        writer
            .write_all(data)
            .map_err(|e| VfsError::backend("write", self.file.name(), e))?;
        writer.finish()
    }

    /// Seekable handle over the content
    pub fn random_access(&self, mode: RandomAccessMode) -> VfsResult<Box<dyn RandomAccessContent>> {
        self.require(Capability::RandomAccessRead)?;
        if mode == RandomAccessMode::ReadWrite {
            self.require(Capability::RandomAccessWrite)?;
        }
        self.require_file()?;
        self.file
            .fs
            .backend()
            .random_access(self.file.name(), mode)
            .map_err(|e| VfsError::backend("open random access to", self.file.name(), e))
    }

    pub fn attributes(&self) -> VfsResult<Attributes> {
        self.require(Capability::GetAttributes)?;
        self.file
            .fs
            .backend()
            .attributes(self.file.name())
            .map_err(|e| VfsError::backend("get the attributes of", self.file.name(), e))
    }

    pub fn attribute(&self, key: &str) -> VfsResult<Option<String>> {
        Ok(self.attributes()?.remove(key))
    }

    pub fn last_modified(&self) -> VfsResult<SystemTime> {
        self.require(Capability::GetLastModified)?;
        self.file
            .fs
            .backend()
            .last_modified(self.file.name())
            .map_err(|e| VfsError::backend("get the last-modified time of", self.file.name(), e))
    }

    pub fn set_last_modified(&self, time: SystemTime) -> VfsResult<()> {
        self.require(Capability::SetLastModified)?;
        if !self.file.exists()? {
            return Err(VfsError::conflict(
                self.file.name(),
                FileType::File,
                FileType::Imaginary,
            ));
        }
        self.file
            .fs
            .backend()
            .set_last_modified(self.file.name(), time)
            .map_err(|e| VfsError::backend("set the last-modified time of", self.file.name(), e))
    }

    /// Certificates the content was signed with
    pub fn certificates(&self) -> VfsResult<Vec<Certificate>> {
        self.require(Capability::Signing)?;
        self.file
            .fs
            .backend()
            .certificates(self.file.name())
            .map_err(|e| VfsError::backend("get the certificates of", self.file.name(), e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Replace,
    Append,
}

/// Buffered content writer
///
/// The buffer reaches the backend on `finish`, or on drop when `finish` was
/// never called (failures on drop are logged).
pub struct ContentWriter {
    file: FileObject,
    mode: WriteMode,
    buffer: Vec<u8>,
    committed: bool,
}

impl ContentWriter {
    fn new(file: FileObject, mode: WriteMode) -> Self {
        Self {
            file,
            mode,
            buffer: Vec::new(),
            committed: false,
        }
    }

    pub fn file(&self) -> &FileObject {
        &self.file
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Commit the buffered bytes to the backend
    pub fn finish(mut self) -> VfsResult<()> {
        self.commit()
    }

    fn commit(&mut self) -> VfsResult<()> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;

        let _guard = self.file.lock_ops();
        let backend = self.file.fs.backend();
        let name = self.file.name();
        let result = match self.mode {
            WriteMode::Replace => backend.write(name, &self.buffer),
            WriteMode::Append => backend.append(name, &self.buffer),
        };
        result.map_err(|e| VfsError::backend("write", name, e))?;
        debug!(name = %name, bytes = self.buffer.len(), mode = ?self.mode, "content committed");
        Ok(())
    }
}

impl Write for ContentWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "content writer already finished",
            ));
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ContentWriter {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            warn!(name = %self.file.name(), error = %err, "content writer failed to commit on drop");
        }
    }
}

impl std::fmt::Debug for ContentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ContentWriter")
            .field("file", self.file.name())
            .field("mode", &self.mode)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
