/*!
 * Replicators
 * Materialize file content into local scratch storage
 */

mod privileged;
mod replica;

use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

use super::name::Name;
use super::object::FileObject;
use super::types::*;

pub use privileged::{InlineExecutor, IsolatedThreadExecutor, PrivilegedExecutor, PrivilegedReplicator};
pub use replica::Replica;

pub(crate) use replica::ReplicaRegistry;

/// Produces local copies of file content
pub trait Replicator: Send + Sync {
    /// Copy the full content of `file` into a new scratch file
    ///
    /// Requires `ReadContent`; `file` must be a file.
    fn replicate(&self, file: &FileObject) -> VfsResult<Replica>;

    /// Replicas handed out and not yet released
    fn outstanding(&self) -> usize;

    /// Remove every outstanding replica
    fn close(&self);
}

enum ScratchDir {
    Owned(TempDir),
    Configured(PathBuf),
}

impl ScratchDir {
    fn path(&self) -> PathBuf {
        match self {
            ScratchDir::Owned(dir) => dir.path().to_path_buf(),
            ScratchDir::Configured(path) => path.clone(),
        }
    }
}

/// Replicator writing copies beneath one scratch directory
///
/// Without a configured directory a private temporary directory is created
/// on first use and removed on drop.
pub struct DefaultReplicator {
    configured: Option<PathBuf>,
    scratch: Mutex<Option<ScratchDir>>,
    registry: Arc<ReplicaRegistry>,
}

impl DefaultReplicator {
    pub fn new(scratch_dir: Option<PathBuf>) -> Self {
        Self {
            configured: scratch_dir,
            scratch: Mutex::new(None),
            registry: Arc::new(ReplicaRegistry::new()),
        }
    }

    /// Scratch directory, created when first needed
    pub fn scratch_dir(&self) -> VfsResult<PathBuf> {
        let mut scratch = self.scratch.lock();
        if let Some(dir) = scratch.as_ref() {
            return Ok(dir.path());
        }

        let dir = match &self.configured {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    VfsError::backend("create scratch directory", path.display(), e)
                })?;
                ScratchDir::Configured(path.clone())
            }
            None => ScratchDir::Owned(
                tempfile::Builder::new()
                    .prefix("strata-vfs-")
                    .tempdir()
                    .map_err(|e| VfsError::backend("create scratch directory", "<temp>", e))?,
            ),
        };
        let path = dir.path();
        debug!(path = %path.display(), "scratch directory ready");
        *scratch = Some(dir);
        Ok(path)
    }

    /// Copy everything `reader` yields into a new replica of `source`
    pub(crate) fn replicate_from(&self, source: &Name, reader: &mut dyn Read) -> VfsResult<Replica> {
        let dir = self.scratch_dir()?;
        let suffix = source.extension().map(|ext| format!(".{}", ext)).unwrap_or_default();
        let mut scratch = tempfile::Builder::new()
            .prefix("replica-")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| VfsError::backend("create replica of", source, e))?;

        let len = io::copy(reader, &mut scratch)
            .and_then(|len| scratch.flush().map(|_| len))
            .map_err(|e| VfsError::backend("replicate", source, e))?;
        let (_, path) = scratch
            .keep()
            .map_err(|e| VfsError::backend("replicate", source, e.error))?;

        Ok(Replica::new(path, len, source.clone(), Arc::clone(&self.registry)))
    }
}

impl Replicator for DefaultReplicator {
    fn replicate(&self, file: &FileObject) -> VfsResult<Replica> {
        let mut input = file.content().input_stream()?;
        self.replicate_from(file.name(), &mut input)
    }

    fn outstanding(&self) -> usize {
        self.registry.len()
    }

    fn close(&self) {
        let removed = self.registry.purge();
        if removed > 0 {
            info!(removed, "released outstanding replicas");
        }
    }
}

impl Default for DefaultReplicator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for DefaultReplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("DefaultReplicator")
            .field("configured", &self.configured)
            .field("outstanding", &self.registry.len())
            .finish()
    }
}

impl Drop for DefaultReplicator {
    fn drop(&mut self) {
        self.registry.purge();
    }
}
