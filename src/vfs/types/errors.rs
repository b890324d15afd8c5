/*!
 * VFS Error Types
 * Structured, type-safe error handling for name resolution and file operations
 */

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::capability::Capability;
use super::file_type::FileType;

/// VFS operation result
///
/// # Must Use
/// VFS operations can fail and must be handled to prevent data loss
#[must_use = "VFS operations can fail and must be handled"]
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS errors
///
/// Every variant names the resource (URI, scheme or provider identifier)
/// it concerns. Serialization uses the tagged enum pattern.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum VfsError {
    #[error("Malformed name {uri:?}: {reason}")]
    #[diagnostic(
        code(vfs::malformed_name),
        help("Names look like `scheme:///path`, `scheme://host/path` or `scheme:outer-uri!/path`.")
    )]
    MalformedName {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        uri: String,
        reason: String,
    },

    #[error("Invalid relative path {path:?} against {base}")]
    #[diagnostic(
        code(vfs::invalid_relative_path),
        help("The path climbs above the root of its filesystem, or has no base to resolve against.")
    )]
    InvalidRelativePath {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        base: String,
        path: String,
    },

    #[error("A provider is already registered for scheme {0:?}")]
    #[diagnostic(
        code(vfs::duplicate_provider),
        help("Each scheme maps to exactly one provider. Register it once at startup.")
    )]
    DuplicateProvider(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Could not create provider {provider:?}: {reason}")]
    #[diagnostic(
        code(vfs::provider_creation),
        help("Check that the provider identifier is registered in the provider table.")
    )]
    ProviderCreation {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        provider: String,
        reason: String,
    },

    #[error("Operation on {name} requires capability {capability}")]
    #[diagnostic(
        code(vfs::unsupported_operation),
        help("The filesystem backing this file does not declare the capability. Check `FileSystem::capabilities()`.")
    )]
    UnsupportedOperation {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        name: String,
        capability: Capability,
    },

    #[error("{name} is a {actual}, expected {expected}")]
    #[diagnostic(
        code(vfs::file_type_conflict),
        help("A file cannot be replaced by a folder (or vice versa) without deleting it first.")
    )]
    FileTypeConflict {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        name: String,
        expected: FileType,
        actual: FileType,
    },

    #[error("Cannot layer scheme {scheme:?} over {name}: {reason}")]
    #[diagnostic(
        code(vfs::layering_unsupported),
        help("The target provider cannot open a filesystem from this kind of content.")
    )]
    LayeringUnsupported {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        scheme: String,
        name: String,
        reason: String,
    },

    #[error("Could not {op} {name}: {detail}")]
    #[diagnostic(
        code(vfs::backend_io),
        help("The backend reported an I/O failure. Inspect the resulting state before retrying.")
    )]
    BackendIo {
        #[serde(deserialize_with = "deserialize_nonempty_string")]
        op: String,
        name: String,
        detail: String,
    },
}

impl VfsError {
    pub fn malformed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        VfsError::MalformedName {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn provider_creation(provider: impl Into<String>, reason: impl ToString) -> Self {
        VfsError::ProviderCreation {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a backend failure with the operation and resource it concerned
    pub fn backend(op: &str, name: impl ToString, err: std::io::Error) -> Self {
        VfsError::BackendIo {
            op: op.to_string(),
            name: name.to_string(),
            detail: err.to_string(),
        }
    }

    /// Operation failure detected by the core before reaching the backend
    pub fn operation(op: &str, name: impl ToString, detail: impl Into<String>) -> Self {
        VfsError::BackendIo {
            op: op.to_string(),
            name: name.to_string(),
            detail: detail.into(),
        }
    }

    pub fn conflict(name: impl ToString, expected: FileType, actual: FileType) -> Self {
        VfsError::FileTypeConflict {
            name: name.to_string(),
            expected,
            actual,
        }
    }
}

/// Deserialize and validate non-empty string for error messages
pub(super) fn deserialize_nonempty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::custom("error context must not be empty"));
    }
    Ok(s)
}
