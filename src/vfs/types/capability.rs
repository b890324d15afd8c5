/*!
 * VFS Capabilities
 * Closed set of operation tags a filesystem backend declares it supports
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// A single operation a backend may support
///
/// Backends report these honestly; the core checks them before every
/// operation and never probes a backend by trial.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Capability {
    Create,
    Delete,
    ListChildren,
    ReadContent,
    WriteContent,
    AppendContent,
    RandomAccessRead,
    RandomAccessWrite,
    GetAttributes,
    GetLastModified,
    SetLastModified,
    /// Content carries signing certificates
    Signing,
    /// Files expose a canonical URI usable outside the VFS
    Uri,
}

impl Capability {
    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u8)
    }

    /// Stable upper-case tag, e.g. `WRITE_CONTENT`
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of capabilities exposed by one filesystem instance
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet {
    bits: u32,
}

impl CapabilitySet {
    /// Empty set
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Every capability
    #[must_use]
    pub fn all() -> Self {
        Capability::iter().collect()
    }

    /// Capabilities of a backend that can be browsed and read but not changed
    #[must_use]
    pub fn read_only() -> Self {
        Self::from_slice(&[
            Capability::ListChildren,
            Capability::ReadContent,
            Capability::RandomAccessRead,
            Capability::GetAttributes,
            Capability::GetLastModified,
        ])
    }

    /// Capabilities of a typical writable hierarchical backend
    #[must_use]
    pub fn read_write() -> Self {
        Self::read_only().union(Self::from_slice(&[
            Capability::Create,
            Capability::Delete,
            Capability::WriteContent,
            Capability::AppendContent,
            Capability::RandomAccessWrite,
            Capability::SetLastModified,
        ]))
    }

    #[must_use]
    pub fn from_slice(caps: &[Capability]) -> Self {
        caps.iter().copied().collect()
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, cap: Capability) -> bool {
        self.bits & cap.bit() != 0
    }

    /// True when every capability in `other` is present
    #[inline]
    #[must_use]
    pub const fn contains_all(&self, other: CapabilitySet) -> bool {
        self.bits & other.bits == other.bits
    }

    pub fn insert(&mut self, cap: Capability) {
        self.bits |= cap.bit();
    }

    pub fn remove(&mut self, cap: Capability) {
        self.bits &= !cap.bit();
    }

    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self {
            bits: self.bits | cap.bit(),
        }
    }

    #[must_use]
    pub const fn without(self, cap: Capability) -> Self {
        Self {
            bits: self.bits & !cap.bit(),
        }
    }

    #[must_use]
    pub const fn union(self, other: CapabilitySet) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn intersection(self, other: CapabilitySet) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Capabilities in this set but not in `other`
    #[must_use]
    pub const fn difference(self, other: CapabilitySet) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// First capability of `required` missing from this set
    #[must_use]
    pub fn first_missing(&self, required: CapabilitySet) -> Option<Capability> {
        required.iter().find(|cap| !self.contains(*cap))
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::iter().filter(move |cap| self.contains(*cap))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl From<Capability> for CapabilitySet {
    fn from(cap: Capability) -> Self {
        Self::empty().with(cap)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tags: Vec<&str> = self.iter().map(Capability::as_str).collect();
        write!(f, "{{{}}}", tags.join(", "))
    }
}

/// Parses a comma-separated list of tags, e.g. `"READ_CONTENT, LIST_CHILDREN"`
impl FromStr for CapabilitySet {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Capability::from_str)
            .collect()
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CapabilitySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let caps = Vec::<Capability>::deserialize(deserializer)?;
        Ok(caps.into_iter().collect())
    }
}
