/*!
 * File System
 * One backend instance under one root name, with its cache and listeners
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use super::cache::{CachePolicy, FilesCache};
use super::listener::{FileChangeEvent, FileListener, ListenerRegistry};
use super::manager::{FileSystemManager, ManagerShared};
use super::name::Name;
use super::object::{FileObject, Node};
use super::traits::Backend;
use super::types::*;

pub struct FileSystem {
    root_name: Name,
    backend: Arc<dyn Backend>,
    capabilities: CapabilitySet,
    provider_id: String,
    parent_layer: Option<FileObject>,
    policy: CachePolicy,
    cache: Box<dyn FilesCache>,
    listeners: ListenerRegistry,
    manager: Weak<ManagerShared>,
    closed: AtomicBool,
}

impl FileSystem {
    pub(crate) fn new(
        root_name: Name,
        backend: Arc<dyn Backend>,
        provider_id: impl Into<String>,
        parent_layer: Option<FileObject>,
        policy: CachePolicy,
        manager: Weak<ManagerShared>,
    ) -> Arc<Self> {
        let capabilities = backend.capabilities();
        let provider_id = provider_id.into();
        debug!(
            root = %root_name,
            provider = %provider_id,
            capabilities = %capabilities,
            ?policy,
            layered = parent_layer.is_some(),
            "opened file system"
        );
        Arc::new(Self {
            root_name,
            backend,
            capabilities,
            provider_id,
            parent_layer,
            policy,
            cache: policy.build(),
            listeners: ListenerRegistry::new(),
            manager,
            closed: AtomicBool::new(false),
        })
    }

    /// Handle for `name`, which must lie under this filesystem's root
    pub fn resolve_file(self: &Arc<Self>, name: &Name) -> VfsResult<FileObject> {
        if !name.same_root(&self.root_name) {
            return Err(VfsError::malformed(
                name.uri(),
                format!("name is outside file system {}", self.root_name),
            ));
        }
        Ok(self.object_for(name))
    }

    fn object_for(self: &Arc<Self>, name: &Name) -> FileObject {
        let node = self
            .cache
            .get_or_insert(name, &mut || Arc::new(Node::new(name.clone())));
        FileObject::new(Arc::clone(self), node)
    }

    /// Root folder of this filesystem
    pub fn root(self: &Arc<Self>) -> FileObject {
        let root = self.root_name.clone();
        self.object_for(&root)
    }

    pub fn root_name(&self) -> &Name {
        &self.root_name
    }

    /// Identifier of the provider that opened this filesystem
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    #[inline]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Fail with `UnsupportedOperation` unless `capability` is declared
    pub fn require(&self, capability: Capability, name: &Name) -> VfsResult<()> {
        if self.has_capability(capability) {
            Ok(())
        } else {
            Err(VfsError::UnsupportedOperation {
                name: name.to_string(),
                capability,
            })
        }
    }

    /// File this filesystem was layered over, if any
    pub fn parent_layer(&self) -> Option<&FileObject> {
        self.parent_layer.as_ref()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.policy
    }

    /// Number of nodes currently held by the cache
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    pub fn add_listener(&self, file: &FileObject, listener: Arc<dyn FileListener>) {
        self.listeners.add(file.name(), listener);
    }

    /// Returns whether the listener was registered for `file`
    pub fn remove_listener(&self, file: &FileObject, listener: &Arc<dyn FileListener>) -> bool {
        self.listeners.remove(file.name(), listener)
    }

    pub fn listener_count(&self, file: &FileObject) -> usize {
        self.listeners.count(file.name())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop cached nodes and listeners, then close the backend
    ///
    /// Idempotent. Handles already given out keep working against the backend
    /// only as far as the backend allows after close.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cache.clear();
        self.listeners.clear();
        self.backend.close();
        info!(root = %self.root_name, provider = %self.provider_id, "closed file system");
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub(crate) fn fire(&self, event: &FileChangeEvent) {
        self.listeners.fire(event);
    }

    pub(crate) fn manager(&self) -> Option<FileSystemManager> {
        self.manager.upgrade().map(FileSystemManager::from_shared)
    }

    pub(crate) fn belongs_to(&self, manager: &Arc<ManagerShared>) -> bool {
        std::ptr::eq(self.manager.as_ptr(), Arc::as_ptr(manager))
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("root", &self.root_name)
            .field("provider", &self.provider_id)
            .field("capabilities", &self.capabilities)
            .field("policy", &self.policy)
            .field("parent_layer", &self.parent_layer.as_ref().map(|p| p.name()))
            .finish()
    }
}
