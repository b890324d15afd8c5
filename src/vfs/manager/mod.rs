/*!
 * File System Manager
 * Scheme dispatch, root and layered filesystem instantiation
 *
 * Each root name maps to at most one filesystem, and each (scheme, parent
 * file) pair to at most one layered filesystem. Construction happens inside
 * a per-key once-cell: concurrent callers wait for the same attempt and see
 * its result; a failed attempt is forgotten so the next call retries.
 */

mod builder;
mod registry;

use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::cache::CachePolicy;
use super::config::VfsConfig;
use super::filesystem::FileSystem;
use super::name::{self, Name};
use super::object::FileObject;
use super::replicator::{Replica, Replicator};
use super::traits::FileProvider;
use super::types::*;

pub use builder::FileSystemManagerBuilder;
pub use registry::{ProviderFactory, ProviderTable};

use registry::ProviderRegistry;

type FsSlot = OnceLock<VfsResult<Arc<FileSystem>>>;
type LayerKey = (String, Name);

/// Run `open` at most once per key at a time and share its result
fn construct_once<K, F>(
    slots: &DashMap<K, Arc<FsSlot>, RandomState>,
    closed: &AtomicBool,
    key: K,
    open: F,
) -> VfsResult<Arc<FileSystem>>
where
    K: Eq + Hash + Clone,
    F: FnOnce() -> VfsResult<Arc<FileSystem>>,
{
    let existing = slots.get(&key).map(|slot| Arc::clone(slot.value()));
    let slot = match existing {
        Some(slot) => slot,
        None => Arc::clone(slots.entry(key.clone()).or_default().value()),
    };

    let result = slot.get_or_init(open).clone();
    // A shutdown may have cleared the map before this slot went in
    if result.is_err() || closed.load(Ordering::Acquire) {
        slots.remove_if(&key, |_, current| Arc::ptr_eq(current, &slot));
    }
    result
}

fn opened<K: Eq + Hash>(slots: &DashMap<K, Arc<FsSlot>, RandomState>) -> Vec<Arc<FileSystem>> {
    slots
        .iter()
        .filter_map(|entry| match entry.value().get() {
            Some(Ok(fs)) => Some(Arc::clone(fs)),
            _ => None,
        })
        .collect()
}

pub(crate) struct ManagerShared {
    id: Uuid,
    config: VfsConfig,
    providers: ProviderRegistry,
    scheme_policies: HashMap<String, CachePolicy, RandomState>,
    replicator: Arc<dyn Replicator>,
    roots: DashMap<Name, Arc<FsSlot>, RandomState>,
    layers: DashMap<LayerKey, Arc<FsSlot>, RandomState>,
    closed: AtomicBool,
}

impl ManagerShared {
    fn policy_for(&self, scheme: &str) -> CachePolicy {
        self.scheme_policies
            .get(scheme)
            .copied()
            .unwrap_or(self.config.cache_policy)
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Layered filesystems hold handles into their parents, close them first
        let layered = opened(&self.layers);
        self.layers.clear();
        let roots = opened(&self.roots);
        self.roots.clear();
        for fs in layered.iter().chain(roots.iter()) {
            fs.close();
        }

        self.replicator.close();
        self.providers.clear();
        info!(
            manager = %self.id,
            file_systems = layered.len() + roots.len(),
            "file system manager closed"
        );
    }
}

impl Drop for ManagerShared {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Entry point for resolving names into file objects
///
/// Cloning yields another handle to the same manager. The manager shuts down
/// when `close` is called or the last handle is dropped.
#[derive(Clone)]
pub struct FileSystemManager {
    shared: Arc<ManagerShared>,
}

impl FileSystemManager {
    /// Manager with no providers and the default configuration
    pub fn new() -> Self {
        Self::with_config(VfsConfig::default())
    }

    pub fn with_config(config: VfsConfig) -> Self {
        let replicator = Arc::new(super::replicator::DefaultReplicator::new(
            config.scratch_dir.clone(),
        ));
        Self::assemble(config, HashMap::default(), replicator)
    }

    pub fn builder() -> FileSystemManagerBuilder {
        FileSystemManagerBuilder::new()
    }

    pub(crate) fn assemble(
        config: VfsConfig,
        scheme_policies: HashMap<String, CachePolicy, RandomState>,
        replicator: Arc<dyn Replicator>,
    ) -> Self {
        let shared = Arc::new(ManagerShared {
            id: Uuid::new_v4(),
            config,
            providers: ProviderRegistry::new(),
            scheme_policies,
            replicator,
            roots: DashMap::with_hasher(RandomState::new()),
            layers: DashMap::with_hasher(RandomState::new()),
            closed: AtomicBool::new(false),
        });
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Arc<ManagerShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &VfsConfig {
        &self.shared.config
    }

    /// Register the provider for `scheme`; one provider per scheme
    pub fn add_provider(&self, scheme: &str, provider: Arc<dyn FileProvider>) -> VfsResult<()> {
        self.shared.providers.add(scheme, provider)
    }

    /// Provider used for schemes without a registered provider
    pub fn set_default_provider(&self, provider: Arc<dyn FileProvider>) {
        self.shared.providers.set_default(provider);
    }

    pub fn has_provider(&self, scheme: &str) -> bool {
        self.shared.providers.contains(scheme)
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        self.shared.providers.schemes()
    }

    pub fn replicator(&self) -> &Arc<dyn Replicator> {
        &self.shared.replicator
    }

    /// Copy `file` into local scratch storage
    pub fn replicate(&self, file: &FileObject) -> VfsResult<Replica> {
        self.ensure_open()?;
        self.shared.replicator.replicate(file)
    }

    /// Resolve `uri` with no base file
    pub fn resolve(&self, uri: &str) -> VfsResult<FileObject> {
        self.resolve_file(None, uri)
    }

    /// Resolve `uri`, relative to `base` when it is not scheme-qualified
    ///
    /// Without a base, an absolute path resolves under the configured local
    /// scheme and a relative path is an error.
    pub fn resolve_file(&self, base: Option<&FileObject>, uri: &str) -> VfsResult<FileObject> {
        self.ensure_open()?;
        if name::has_scheme(uri) {
            let name = Name::parse(uri)?;
            return self.resolve_name(&name);
        }

        match base {
            Some(base) => {
                let name = base.name().resolve(uri)?;
                base.file_system().resolve_file(&name)
            }
            None if uri.starts_with('/') || uri.starts_with('\\') => {
                let local = format!("{}://{}", self.shared.config.local_scheme, uri);
                self.resolve_name(&Name::parse(&local)?)
            }
            None => Err(VfsError::InvalidRelativePath {
                base: "<none>".to_string(),
                path: uri.to_string(),
            }),
        }
    }

    /// Handle for an already parsed name
    ///
    /// Layered names resolve their outer file first, layer it, then resolve
    /// inside the layered filesystem.
    pub fn resolve_name(&self, name: &Name) -> VfsResult<FileObject> {
        self.ensure_open()?;
        if let Some(outer) = name.outer() {
            let outer_file = self.resolve_name(outer)?;
            let layer_root = self.create_file_system(name.scheme(), &outer_file)?;
            return layer_root.file_system().resolve_file(name);
        }

        let provider = self.provider_for(name.scheme())?;
        let root = provider.root_name(name);
        self.root_file_system(&root, &provider)?.resolve_file(name)
    }

    fn root_file_system(
        &self,
        root: &Name,
        provider: &Arc<dyn FileProvider>,
    ) -> VfsResult<Arc<FileSystem>> {
        let shared = &self.shared;
        let fs = construct_once(&shared.roots, &shared.closed, root.clone(), || {
            let backend = provider.open(root, None)?;
            Ok(FileSystem::new(
                root.clone(),
                backend,
                provider.id(),
                None,
                shared.policy_for(root.scheme()),
                Arc::downgrade(shared),
            ))
        })?;
        self.checked_open(fs)
    }

    /// Open `file` as the root of a new filesystem of kind `scheme`
    ///
    /// Repeated calls for the same scheme and file return the same
    /// filesystem.
    pub fn create_file_system(&self, scheme: &str, file: &FileObject) -> VfsResult<FileObject> {
        self.ensure_open()?;
        let scheme = scheme.to_ascii_lowercase();
        let unsupported = |reason: String| VfsError::LayeringUnsupported {
            scheme: scheme.clone(),
            name: file.name().to_string(),
            reason,
        };

        if !file.file_system().belongs_to(&self.shared) {
            return Err(unsupported("file belongs to another manager".to_string()));
        }
        let provider = self.provider_for(&scheme)?;
        let source = provider.layer_source().ok_or_else(|| {
            unsupported(format!("provider {} does not open layered file systems", provider.id()))
        })?;
        let actual = file.file_type()?;
        if actual != source {
            return Err(unsupported(format!("expected a {}, found a {}", source, actual)));
        }

        let shared = &self.shared;
        let key = (scheme.clone(), file.name().clone());
        let fs = construct_once(&shared.layers, &shared.closed, key, || {
            let root = Name::layered_root(&scheme, file.name());
            debug!(root = %root, provider = provider.id(), "layering file system");
            let backend = provider.open(&root, Some(file))?;
            Ok(FileSystem::new(
                root,
                backend,
                provider.id(),
                Some(file.clone()),
                shared.policy_for(&scheme),
                Arc::downgrade(shared),
            ))
        })?;
        Ok(self.checked_open(fs)?.root())
    }

    /// Number of filesystems opened so far
    pub fn file_system_count(&self) -> usize {
        opened(&self.shared.roots).len() + opened(&self.shared.layers).len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Close every filesystem and release outstanding replicas
    ///
    /// Idempotent; later resolutions fail.
    pub fn close(&self) {
        self.shared.shutdown();
    }

    fn provider_for(&self, scheme: &str) -> VfsResult<Arc<dyn FileProvider>> {
        self.shared.providers.lookup(scheme).ok_or_else(|| {
            VfsError::provider_creation(scheme, "no provider is registered for this scheme")
        })
    }

    fn ensure_open(&self) -> VfsResult<()> {
        if self.is_closed() {
            return Err(VfsError::provider_creation(
                format!("manager {}", self.shared.id),
                "file system manager is closed",
            ));
        }
        Ok(())
    }

    /// Close filesystems that finished opening after a concurrent shutdown
    fn checked_open(&self, fs: Arc<FileSystem>) -> VfsResult<Arc<FileSystem>> {
        if let Err(err) = self.ensure_open() {
            fs.close();
            return Err(err);
        }
        Ok(fs)
    }
}

impl Default for FileSystemManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileSystemManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FileSystemManager")
            .field("id", &self.shared.id)
            .field("schemes", &self.schemes())
            .field("closed", &self.is_closed())
            .finish()
    }
}
