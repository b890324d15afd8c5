/*!
 * VFS Types
 * Shared types for name resolution and file operations
 */

mod capability;
mod errors;
mod file_type;

pub use capability::{Capability, CapabilitySet};
pub use errors::{VfsError, VfsResult};
pub use file_type::FileType;

/// String-keyed attribute map exposed by file content (e.g. archive manifest fields)
pub type Attributes = std::collections::BTreeMap<String, String>;
