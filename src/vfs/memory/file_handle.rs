/*!
 * Memory Random Access
 * Seekable handle over a copy of an in-memory file
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;

use super::node::MemNode;
use crate::vfs::traits::{RandomAccessContent, RandomAccessMode};

/// Random-access handle; writes reach the node on `sync` or drop
pub(super) struct MemRandomAccess {
    pub nodes: Arc<DashMap<String, MemNode, RandomState>>,
    pub path: String,
    pub cursor: Cursor<Vec<u8>>,
    pub mode: RandomAccessMode,
    pub dirty: bool,
}

impl MemRandomAccess {
    fn write_back(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut node = self
            .nodes
            .get_mut(&self.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file was deleted"))?;
        match node.value_mut() {
            MemNode::File { data, modified, .. } => {
                data.clone_from(self.cursor.get_ref());
                *modified = SystemTime::now();
            }
            MemNode::Folder { .. } => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "file was replaced by a folder",
                ))
            }
        }
        self.dirty = false;
        Ok(())
    }
}

impl Read for MemRandomAccess {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemRandomAccess {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode == RandomAccessMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle opened for reading",
            ));
        }
        self.dirty = true;
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemRandomAccess {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl RandomAccessContent for MemRandomAccess {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.write_back()
    }
}

impl Drop for MemRandomAccess {
    fn drop(&mut self) {
        // Auto-sync on drop if written to
        if let Err(e) = self.write_back() {
            warn!(path = %self.path, error = %e, "random access write-back failed");
        }
    }
}
