/*!
 * VFS File Type Enum
 * Existence/type state of a file object
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a resource as reported by its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// The resource does not exist
    Imaginary,
    File,
    Folder,
}

impl FileType {
    #[inline]
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, FileType::Imaginary)
    }

    /// Whether a node of this type may have children
    #[inline]
    #[must_use]
    pub const fn has_children(self) -> bool {
        matches!(self, FileType::Folder)
    }

    /// Whether a node of this type carries content
    #[inline]
    #[must_use]
    pub const fn has_content(self) -> bool {
        matches!(self, FileType::File)
    }
}

impl Default for FileType {
    fn default() -> Self {
        Self::Imaginary
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileType::Imaginary => write!(f, "imaginary"),
            FileType::File => write!(f, "file"),
            FileType::Folder => write!(f, "folder"),
        }
    }
}
