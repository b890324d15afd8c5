/*!
 * File System Manager Builder
 * Builder pattern for FileSystemManager construction
 */

use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::registry::ProviderTable;
use super::FileSystemManager;
use crate::vfs::cache::CachePolicy;
use crate::vfs::config::VfsConfig;
use crate::vfs::replicator::{DefaultReplicator, Replicator};
use crate::vfs::traits::FileProvider;
use crate::vfs::types::VfsResult;

enum ProviderSource {
    Instance(Arc<dyn FileProvider>),
    Id(String),
}

/// Builder for FileSystemManager
pub struct FileSystemManagerBuilder {
    config: VfsConfig,
    table: ProviderTable,
    providers: Vec<(String, ProviderSource)>,
    default_provider: Option<ProviderSource>,
    replicator: Option<Arc<dyn Replicator>>,
    scheme_policies: HashMap<String, CachePolicy, RandomState>,
}

impl FileSystemManagerBuilder {
    /// Create a new builder with the standard provider table
    pub fn new() -> Self {
        Self {
            config: VfsConfig::default(),
            table: ProviderTable::standard(),
            providers: Vec::new(),
            default_provider: None,
            replicator: None,
            scheme_policies: HashMap::default(),
        }
    }

    pub fn with_config(mut self, config: VfsConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache policy for every scheme without an override
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.config.cache_policy = policy;
        self
    }

    /// Cache policy for filesystems of one scheme
    pub fn with_scheme_cache_policy(mut self, scheme: &str, policy: CachePolicy) -> Self {
        self.scheme_policies.insert(scheme.to_ascii_lowercase(), policy);
        self
    }

    /// Replace the table `with_provider_id` looks identifiers up in
    pub fn with_provider_table(mut self, table: ProviderTable) -> Self {
        self.table = table;
        self
    }

    /// Register a provider instance for `scheme`
    pub fn with_provider(mut self, scheme: &str, provider: Arc<dyn FileProvider>) -> Self {
        self.providers
            .push((scheme.to_string(), ProviderSource::Instance(provider)));
        self
    }

    /// Register the provider built from table entry `id` for `scheme`
    pub fn with_provider_id(mut self, scheme: &str, id: &str) -> Self {
        self.providers
            .push((scheme.to_string(), ProviderSource::Id(id.to_string())));
        self
    }

    /// Bundled providers: local disk under the configured local scheme, and `mem`
    pub fn with_standard_providers(self) -> Self {
        let local = self.config.local_scheme.clone();
        self.with_provider_id(&local, "local").with_provider_id("mem", "mem")
    }

    pub fn with_default_provider(mut self, provider: Arc<dyn FileProvider>) -> Self {
        self.default_provider = Some(ProviderSource::Instance(provider));
        self
    }

    pub fn with_default_provider_id(mut self, id: &str) -> Self {
        self.default_provider = Some(ProviderSource::Id(id.to_string()));
        self
    }

    pub fn with_replicator(mut self, replicator: Arc<dyn Replicator>) -> Self {
        self.replicator = Some(replicator);
        self
    }

    fn instantiate(&self, source: ProviderSource) -> VfsResult<Arc<dyn FileProvider>> {
        match source {
            ProviderSource::Instance(provider) => Ok(provider),
            ProviderSource::Id(id) => self.table.instantiate(&id, &self.config),
        }
    }

    /// Build the FileSystemManager
    ///
    /// Unknown provider identifiers and failing factories are reported here,
    /// never at resolution time.
    pub fn build(mut self) -> VfsResult<FileSystemManager> {
        let mut resolved = Vec::with_capacity(self.providers.len());
        for (scheme, source) in std::mem::take(&mut self.providers) {
            resolved.push((scheme, self.instantiate(source)?));
        }
        let default_provider = match self.default_provider.take() {
            Some(source) => Some(self.instantiate(source)?),
            None => None,
        };

        let replicator = match self.replicator {
            Some(replicator) => replicator,
            None => Arc::new(DefaultReplicator::new(self.config.scratch_dir.clone())),
        };
        let manager = FileSystemManager::assemble(self.config, self.scheme_policies, replicator);

        for (scheme, provider) in resolved {
            manager.add_provider(&scheme, provider)?;
        }
        if let Some(provider) = default_provider {
            manager.set_default_provider(provider);
        }

        info!(
            manager = %manager.id(),
            schemes = ?manager.schemes(),
            "file system manager ready"
        );
        Ok(manager)
    }
}

impl Default for FileSystemManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
