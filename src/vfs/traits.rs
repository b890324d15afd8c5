/*!
 * VFS Traits
 * Boundary between the core and pluggable backends
 */

use std::io::{self, Read, Seek, Write};
use std::sync::Arc;
use std::time::SystemTime;

use super::name::Name;
use super::object::FileObject;
use super::types::*;

/// Opaque certificate bytes (e.g. DER) attached to signed content
pub type Certificate = Vec<u8>;

/// Access mode for random-access content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomAccessMode {
    Read,
    ReadWrite,
}

/// Seekable content handle
///
/// Writes become visible to other readers after `sync` or drop.
pub trait RandomAccessContent: Read + Write + Seek + Send {
    /// Current content length in bytes
    fn len(&mut self) -> io::Result<u64>;

    /// Flush pending writes to the backend
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl RandomAccessContent for std::fs::File {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

pub(crate) fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("{} is not supported", what))
}

/// Backend filesystem trait
///
/// Implemented by every concrete backend (local disk, archives, network
/// protocols). The core guarantees:
/// - a capability is checked before the matching call is made,
/// - `create_file`/`create_folder` are called only once the parent is a folder,
/// - `delete` is called on a folder only after its children are gone.
///
/// Methods report failures as plain I/O errors; the core wraps them with the
/// operation and name.
pub trait Backend: Send + Sync {
    /// Capabilities this backend supports, reported honestly
    fn capabilities(&self) -> CapabilitySet;

    /// Current type of `name` (`Imaginary` if it does not exist)
    fn file_type(&self, name: &Name) -> io::Result<FileType>;

    /// Base names of the children of a folder
    fn list_children(&self, name: &Name) -> io::Result<Vec<String>>;

    /// Create a single folder
    fn create_folder(&self, name: &Name) -> io::Result<()>;

    /// Create a single empty file
    fn create_file(&self, name: &Name) -> io::Result<()>;

    /// Delete a single file or empty folder
    fn delete(&self, name: &Name) -> io::Result<()>;

    /// Open a sequential reader over the content
    fn read(&self, name: &Name) -> io::Result<Box<dyn Read + Send>>;

    /// Replace the content of an existing file
    fn write(&self, name: &Name, data: &[u8]) -> io::Result<()>;

    /// Append to the content of an existing file
    fn append(&self, _name: &Name, _data: &[u8]) -> io::Result<()> {
        Err(unsupported("append"))
    }

    /// Open a seekable handle over the content
    fn random_access(
        &self,
        _name: &Name,
        _mode: RandomAccessMode,
    ) -> io::Result<Box<dyn RandomAccessContent>> {
        Err(unsupported("random access"))
    }

    /// Content size in bytes
    fn size(&self, name: &Name) -> io::Result<u64>;

    fn last_modified(&self, _name: &Name) -> io::Result<SystemTime> {
        Err(unsupported("last-modified time"))
    }

    fn set_last_modified(&self, _name: &Name, _time: SystemTime) -> io::Result<()> {
        Err(unsupported("setting last-modified time"))
    }

    /// Backend-populated attribute map
    fn attributes(&self, _name: &Name) -> io::Result<Attributes> {
        Ok(Attributes::new())
    }

    /// Certificates the content was signed with
    fn certificates(&self, _name: &Name) -> io::Result<Vec<Certificate>> {
        Ok(Vec::new())
    }

    /// Release backend resources; called once when the owning filesystem closes
    fn close(&self) {}
}

/// Backend-scoped factory registered per scheme
pub trait FileProvider: Send + Sync {
    /// Identifier used in logs and errors
    fn id(&self) -> &str;

    /// Root name of the filesystem that contains `name`
    fn root_name(&self, name: &Name) -> Name {
        name.root()
    }

    /// Kind of file this provider can open a layered filesystem from
    ///
    /// `None` means the provider only serves root filesystems.
    fn layer_source(&self) -> Option<FileType> {
        None
    }

    /// Open a backend for `root`, reading from `parent_layer` when layering
    fn open(&self, root: &Name, parent_layer: Option<&FileObject>) -> VfsResult<Arc<dyn Backend>>;
}
