/*!
 * VFS Configuration
 *
 * Manager-wide settings with environment overrides
 */

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use super::cache::CachePolicy;

pub const ENV_CACHE_POLICY: &str = "STRATA_CACHE_POLICY";
pub const ENV_SCRATCH_DIR: &str = "STRATA_SCRATCH_DIR";
pub const ENV_LOCAL_SCHEME: &str = "STRATA_LOCAL_SCHEME";
pub const ENV_ARCHIVE_SCHEME: &str = "STRATA_ARCHIVE_SCHEME";

/// Manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Cache policy for filesystems without a per-scheme override
    pub cache_policy: CachePolicy,
    /// Directory for replicas; a private temporary directory when unset
    pub scratch_dir: Option<PathBuf>,
    /// Scheme used for absolute paths resolved without a base
    pub local_scheme: String,
    /// Scheme used to open file entries of a resource search path
    pub archive_scheme: String,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::Default,
            scratch_dir: None,
            local_scheme: "file".to_string(),
            archive_scheme: "jar".to_string(),
        }
    }
}

impl VfsConfig {
    /// Every resolution returns a fresh handle
    pub fn uncached() -> Self {
        Self {
            cache_policy: CachePolicy::NoCache,
            ..Self::default()
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Defaults overridden by `STRATA_*` environment variables
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_CACHE_POLICY) {
            match CachePolicy::from_str(value.trim()) {
                Ok(policy) => self.cache_policy = policy,
                Err(_) => warn!(value = %value, "ignoring unknown {}", ENV_CACHE_POLICY),
            }
        }
        if let Some(dir) = lookup(ENV_SCRATCH_DIR).filter(|v| !v.trim().is_empty()) {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(scheme) = lookup(ENV_LOCAL_SCHEME).filter(|v| !v.trim().is_empty()) {
            self.local_scheme = scheme.trim().to_ascii_lowercase();
        }
        if let Some(scheme) = lookup(ENV_ARCHIVE_SCHEME).filter(|v| !v.trim().is_empty()) {
            self.archive_scheme = scheme.trim().to_ascii_lowercase();
        }
        self
    }
}
