/*!
 * Files Cache
 * Per-filesystem identity map from name to file node
 */

use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString, IntoStaticStr};

use super::name::Name;
use super::object::Node;

/// How a filesystem hands out file nodes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CachePolicy {
    /// Equal names resolve to the same node
    #[default]
    Default,
    /// Every resolution builds a fresh node
    #[strum(to_string = "no_cache", serialize = "none")]
    NoCache,
}

impl CachePolicy {
    pub(crate) fn build(self) -> Box<dyn FilesCache> {
        match self {
            CachePolicy::Default => Box::new(DefaultFilesCache::new()),
            CachePolicy::NoCache => Box::new(NullFilesCache),
        }
    }
}

/// Storage behind `FileSystem::resolve_file`
pub(crate) trait FilesCache: Send + Sync {
    /// Cached node for `name`, or the one built by `make`
    fn get_or_insert(&self, name: &Name, make: &mut dyn FnMut() -> Arc<Node>) -> Arc<Node>;

    fn len(&self) -> usize;

    fn clear(&self);
}

/// Sharded identity map
///
/// The entry API holds the shard lock between lookup and insert, so racing
/// first resolutions of one name build a single node.
pub(crate) struct DefaultFilesCache {
    nodes: DashMap<Name, Arc<Node>, RandomState>,
}

impl DefaultFilesCache {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl FilesCache for DefaultFilesCache {
    fn get_or_insert(&self, name: &Name, make: &mut dyn FnMut() -> Arc<Node>) -> Arc<Node> {
        if let Some(node) = self.nodes.get(name) {
            return Arc::clone(node.value());
        }
        Arc::clone(self.nodes.entry(name.clone()).or_insert_with(make).value())
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&self) {
        self.nodes.clear();
    }
}

/// Cache that never retains anything
pub(crate) struct NullFilesCache;

impl FilesCache for NullFilesCache {
    fn get_or_insert(&self, _name: &Name, make: &mut dyn FnMut() -> Arc<Node>) -> Arc<Node> {
        make()
    }

    fn len(&self) -> usize {
        0
    }

    fn clear(&self) {}
}
