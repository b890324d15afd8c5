/*!
 * Strata VFS Library
 * Layered virtual file system over pluggable backends
 */

pub mod telemetry;
pub mod vfs;

// Re-exports
pub use telemetry::init_tracing;
pub use vfs::*;
