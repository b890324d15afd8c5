/*!
 * Local Disk Backend
 * Wraps std::fs for host filesystem access
 */

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use super::name::Name;
use super::object::FileObject;
use super::traits::{Backend, FileProvider, RandomAccessContent, RandomAccessMode};
use super::types::*;

/// Backend mapping names onto paths beneath a host directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    capabilities: CapabilitySet,
}

impl LocalBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            capabilities: Self::default_capabilities(),
        }
    }

    /// Backend refusing every mutation
    pub fn readonly<P: Into<PathBuf>>(root: P) -> Self {
        let writes = CapabilitySet::from_slice(&[
            Capability::Create,
            Capability::Delete,
            Capability::WriteContent,
            Capability::AppendContent,
            Capability::RandomAccessWrite,
            Capability::SetLastModified,
        ]);
        Self {
            root: root.into(),
            capabilities: Self::default_capabilities().difference(writes),
        }
    }

    fn default_capabilities() -> CapabilitySet {
        CapabilitySet::all().without(Capability::Signing)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path of `name`
    ///
    /// Names are already normalized, so segments never climb out of the root.
    pub fn host_path(&self, name: &Name) -> PathBuf {
        let mut path = self.root.clone();
        for segment in name.segments() {
            path.push(segment);
        }
        path
    }
}

impl Backend for LocalBackend {
    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn file_type(&self, name: &Name) -> io::Result<FileType> {
        match fs::metadata(self.host_path(name)) {
            Ok(md) if md.is_dir() => Ok(FileType::Folder),
            Ok(_) => Ok(FileType::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileType::Imaginary),
            Err(e) => Err(e),
        }
    }

    fn list_children(&self, name: &Name) -> io::Result<Vec<String>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(self.host_path(name))? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(child) => children.push(child),
                Err(raw) => tracing::warn!(
                    folder = %name,
                    entry = ?raw,
                    "skipping entry with a non UTF-8 name"
                ),
            }
        }
        Ok(children)
    }

    fn create_folder(&self, name: &Name) -> io::Result<()> {
        fs::create_dir(self.host_path(name))
    }

    fn create_file(&self, name: &Name) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.host_path(name))
            .map(|_| ())
    }

    fn delete(&self, name: &Name) -> io::Result<()> {
        let path = self.host_path(name);
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn read(&self, name: &Name) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(io::BufReader::new(fs::File::open(self.host_path(name))?)))
    }

    fn write(&self, name: &Name, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.host_path(name))?;
        file.write_all(data)?;
        file.sync_data()
    }

    fn append(&self, name: &Name, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(self.host_path(name))?;
        file.write_all(data)
    }

    fn random_access(
        &self,
        name: &Name,
        mode: RandomAccessMode,
    ) -> io::Result<Box<dyn RandomAccessContent>> {
        let file = OpenOptions::new()
            .read(true)
            .write(mode == RandomAccessMode::ReadWrite)
            .open(self.host_path(name))?;
        Ok(Box::new(file))
    }

    fn size(&self, name: &Name) -> io::Result<u64> {
        Ok(fs::metadata(self.host_path(name))?.len())
    }

    fn last_modified(&self, name: &Name) -> io::Result<SystemTime> {
        fs::metadata(self.host_path(name))?.modified()
    }

    fn set_last_modified(&self, name: &Name, time: SystemTime) -> io::Result<()> {
        let path = self.host_path(name);
        let file = if path.is_dir() {
            fs::File::open(&path)?
        } else {
            OpenOptions::new().write(true).open(&path)?
        };
        file.set_modified(time)
    }
}

/// Provider for host disk access beneath one directory
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
    readonly: bool,
}

impl LocalProvider {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            readonly: false,
        }
    }

    pub fn readonly<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            readonly: true,
        }
    }
}

impl FileProvider for LocalProvider {
    fn id(&self) -> &str {
        "local"
    }

    fn open(&self, root: &Name, _parent_layer: Option<&FileObject>) -> VfsResult<Arc<dyn Backend>> {
        if root.outer().is_some() || root.authority().is_some() {
            return Err(VfsError::provider_creation(
                self.id(),
                format!("{} is not a local disk root", root),
            ));
        }
        let backend = if self.readonly {
            LocalBackend::readonly(&self.root)
        } else {
            LocalBackend::new(&self.root)
        };
        Ok(Arc::new(backend))
    }
}
