/*!
 * Memory Node Types
 * Internal representation of in-memory files and folders
 */

use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::vfs::traits::Certificate;
use crate::vfs::types::{Attributes, FileType};

/// In-memory node
#[derive(Debug, Clone)]
pub(super) enum MemNode {
    File {
        data: Vec<u8>,
        modified: SystemTime,
        attributes: Attributes,
        certificates: Vec<Certificate>,
    },
    Folder {
        children: BTreeSet<String>,
        modified: SystemTime,
        attributes: Attributes,
    },
}

impl MemNode {
    pub fn file() -> Self {
        MemNode::File {
            data: Vec::new(),
            modified: SystemTime::now(),
            attributes: Attributes::new(),
            certificates: Vec::new(),
        }
    }

    pub fn folder() -> Self {
        MemNode::Folder {
            children: BTreeSet::new(),
            modified: SystemTime::now(),
            attributes: Attributes::new(),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self {
            MemNode::File { .. } => FileType::File,
            MemNode::Folder { .. } => FileType::Folder,
        }
    }

    pub fn modified(&self) -> SystemTime {
        match self {
            MemNode::File { modified, .. } | MemNode::Folder { modified, .. } => *modified,
        }
    }

    pub fn set_modified(&mut self, time: SystemTime) {
        match self {
            MemNode::File { modified, .. } | MemNode::Folder { modified, .. } => *modified = time,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            MemNode::File { attributes, .. } | MemNode::Folder { attributes, .. } => attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            MemNode::File { attributes, .. } | MemNode::Folder { attributes, .. } => attributes,
        }
    }
}
