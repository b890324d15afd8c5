/*!
 * Virtual File System Module
 * Scheme-qualified names, pluggable backends and layered filesystems
 */

pub mod cache;
pub mod config;
pub mod filesystem;
pub mod layers;
pub mod listener;
pub mod local;
pub mod manager;
pub mod memory;
pub mod name;
pub mod object;
pub mod replicator;
pub mod selector;
pub mod traits;
pub mod types;

// Re-exports
pub use cache::CachePolicy;
pub use config::VfsConfig;
pub use filesystem::FileSystem;
pub use layers::{aggregate_layer_metadata, LayerChain, Resource, ResourceSearchPath};
pub use listener::{FileChangeEvent, FileChangeKind, FileListener};
pub use local::{LocalBackend, LocalProvider};
pub use manager::{FileSystemManager, FileSystemManagerBuilder, ProviderFactory, ProviderTable};
pub use memory::{MemBackend, MemProvider};
pub use name::{has_scheme, Authority, Name};
pub use object::{ContentWriter, FileContent, FileObject};
pub use replicator::{
    DefaultReplicator, InlineExecutor, IsolatedThreadExecutor, PrivilegedExecutor,
    PrivilegedReplicator, Replica, Replicator,
};
pub use selector::{DepthSelector, FileSelector, SelectInfo, Selectors, TraversalOrder, TypeSelector};
pub use traits::{Backend, Certificate, FileProvider, RandomAccessContent, RandomAccessMode};
pub use types::{Attributes, Capability, CapabilitySet, FileType, VfsError, VfsResult};
