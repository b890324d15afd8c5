/*!
 * Replica Guards
 *
 * RAII guards for scratch copies with automatic removal
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

use crate::vfs::name::Name;
use crate::vfs::types::{VfsError, VfsResult};

/// Outstanding replicas of one replicator
#[derive(Default)]
pub(crate) struct ReplicaRegistry {
    entries: DashMap<Uuid, PathBuf, RandomState>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: Uuid, path: PathBuf) {
        self.entries.insert(id, path);
    }

    pub fn take(&self, id: &Uuid) -> Option<PathBuf> {
        self.entries.remove(id).map(|(_, path)| path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove every outstanding replica file; returns how many were removed
    pub fn purge(&self) -> usize {
        let ids: Vec<Uuid> = self.entries.iter().map(|e| *e.key()).collect();
        let mut removed = 0;
        for id in ids {
            if let Some(path) = self.take(&id) {
                match remove_scratch(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => error!(path = %path.display(), error = %e, "failed to remove replica"),
                }
            }
        }
        removed
    }
}

fn remove_scratch(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Local random-access copy of a file's content
///
/// # Example
///
/// ```rust,ignore
/// let replica = manager.replicate(&file)?;
/// let mut handle = replica.open()?;
/// // Seek and read the local copy
/// // Removed on drop
/// ```
pub struct Replica {
    id: Uuid,
    path: PathBuf,
    len: u64,
    source: Name,
    registry: Arc<ReplicaRegistry>,
    created: Instant,
    active: bool,
}

impl Replica {
    pub(crate) fn new(
        path: PathBuf,
        len: u64,
        source: Name,
        registry: Arc<ReplicaRegistry>,
    ) -> Self {
        let id = Uuid::new_v4();
        registry.insert(id, path.clone());
        debug!(source = %source, path = %path.display(), bytes = len, "replica created");
        Self {
            id,
            path,
            len,
            source,
            registry,
            created: Instant::now(),
            active: true,
        }
    }

    /// Location of the scratch copy
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the content was copied from
    pub fn source(&self) -> &Name {
        &self.source
    }

    /// Size of the copy in bytes
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// False once released, or once the owning replicator has closed
    pub fn is_active(&self) -> bool {
        self.active && self.path.exists()
    }

    /// Open the copy for random access
    pub fn open(&self) -> VfsResult<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| VfsError::backend("open replica of", &self.source, e))
    }

    /// Remove the copy now
    pub fn release(mut self) -> VfsResult<()> {
        self.release_inner()
            .map_err(|e| VfsError::backend("release replica of", &self.source, e))
    }

    fn release_inner(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        // Already gone when the replicator purged it
        if let Some(path) = self.registry.take(&self.id) {
            remove_scratch(&path)?;
        }
        debug!(
            source = %self.source,
            lifetime_micros = self.created.elapsed().as_micros() as u64,
            "replica released"
        );
        Ok(())
    }
}

impl Drop for Replica {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            error!(source = %self.source, path = %self.path.display(), error = %e, "replica drop failed");
        }
    }
}

impl std::fmt::Debug for Replica {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Replica")
            .field("source", &self.source)
            .field("path", &self.path)
            .field("len", &self.len)
            .field("active", &self.active)
            .finish()
    }
}
