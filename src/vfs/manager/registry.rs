/*!
 * Provider Registry
 * Scheme -> provider dispatch and the identifier table used to build providers
 */

use ahash::RandomState;
use arc_swap::ArcSwapOption;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::vfs::config::VfsConfig;
use crate::vfs::local::LocalProvider;
use crate::vfs::memory::MemProvider;
use crate::vfs::traits::FileProvider;
use crate::vfs::types::{VfsError, VfsResult};

/// Registered providers plus the fallback for unknown schemes
pub(crate) struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn FileProvider>, RandomState>,
    default: ArcSwapOption<Arc<dyn FileProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: DashMap::with_hasher(RandomState::new()),
            default: ArcSwapOption::empty(),
        }
    }

    pub fn add(&self, scheme: &str, provider: Arc<dyn FileProvider>) -> VfsResult<()> {
        let scheme = scheme.to_ascii_lowercase();
        match self.providers.entry(scheme) {
            Entry::Occupied(entry) => Err(VfsError::DuplicateProvider(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(scheme = %entry.key(), provider = provider.id(), "registered provider");
                entry.insert(provider);
                Ok(())
            }
        }
    }

    pub fn set_default(&self, provider: Arc<dyn FileProvider>) {
        debug!(provider = provider.id(), "set default provider");
        self.default.store(Some(Arc::new(provider)));
    }

    /// Provider registered for `scheme`
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn FileProvider>> {
        self.providers
            .get(scheme)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Registered provider, else the default
    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn FileProvider>> {
        self.get(scheme).or_else(|| self.default_provider())
    }

    pub fn default_provider(&self) -> Option<Arc<dyn FileProvider>> {
        self.default.load_full().map(|provider| Arc::clone(&*provider))
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.providers.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn clear(&self) {
        self.providers.clear();
        self.default.store(None);
    }
}

/// Builds a provider from the manager configuration
pub type ProviderFactory =
    Arc<dyn Fn(&VfsConfig) -> VfsResult<Arc<dyn FileProvider>> + Send + Sync>;

/// Provider identifier -> factory
///
/// Lets wiring code name providers by identifier instead of constructing
/// them directly.
#[derive(Clone, Default)]
pub struct ProviderTable {
    factories: HashMap<String, ProviderFactory, RandomState>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the bundled `mem` and `local` providers
    pub fn standard() -> Self {
        Self::new()
            .with("mem", |_| Ok(Arc::new(MemProvider::new()) as Arc<dyn FileProvider>))
            .with("local", |_| {
                Ok(Arc::new(LocalProvider::new("/")) as Arc<dyn FileProvider>)
            })
    }

    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&VfsConfig) -> VfsResult<Arc<dyn FileProvider>> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    /// Register or replace the factory for `id`
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&VfsConfig) -> VfsResult<Arc<dyn FileProvider>> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Instantiate the provider registered as `id`
    pub fn instantiate(&self, id: &str, config: &VfsConfig) -> VfsResult<Arc<dyn FileProvider>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| VfsError::provider_creation(id, "no such provider identifier"))?;
        factory(config).map_err(|err| match err {
            err @ VfsError::ProviderCreation { .. } => err,
            other => VfsError::provider_creation(id, other),
        })
    }
}

impl fmt::Debug for ProviderTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProviderTable").field("ids", &self.ids()).finish()
    }
}
