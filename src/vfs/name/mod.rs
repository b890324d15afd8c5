/*!
 * Name Model
 * Immutable, canonical, scheme-qualified hierarchical resource names
 *
 * Canonical forms:
 * - `scheme:///a/b` (no authority, e.g. local disk)
 * - `scheme://user@host:port/a/b` (network schemes)
 * - `scheme:<outer-uri>!/a/b` (layered: a path inside another file)
 *
 * Equality, ordering and hashing are defined over the canonical URI string.
 * In the URI a segment's `!` is written `%21` and its `%` is written `%25`, so
 * the only `!` left in a URI is a layer separator.
 */

mod parse;
mod resolve;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smartstring::alias::String as SegmentString;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::types::{VfsError, VfsResult};

pub use parse::has_scheme;

/// Separator between path segments
pub const SEPARATOR: char = '/';

/// Network location part of a name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Authority {
    user_info: Option<String>,
    host: String,
    port: Option<u16>,
}

impl Authority {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            user_info: None,
            host: host.into().to_ascii_lowercase(),
            port: None,
        }
    }

    pub fn with_user_info(mut self, user_info: impl Into<String>) -> Self {
        self.user_info = Some(user_info.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user_info(&self) -> Option<&str> {
        self.user_info.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(user_info) = &self.user_info {
            write!(f, "{}@", user_info)?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

struct NameInner {
    scheme: SegmentString,
    authority: Option<Authority>,
    outer: Option<Name>,
    segments: Vec<SegmentString>,
    uri: String,
}

/// A canonical resource name
///
/// Cheap to clone; the parts and the canonical URI are shared.
#[derive(Clone)]
pub struct Name(Arc<NameInner>);

impl Name {
    /// Parse a scheme-qualified URI into its canonical form
    pub fn parse(uri: &str) -> VfsResult<Name> {
        parse::parse(uri)
    }

    /// Root name of a plain (non-layered) filesystem
    pub fn root_of(scheme: &str, authority: Option<Authority>) -> Name {
        Name::from_parts(
            SegmentString::from(scheme.to_ascii_lowercase()),
            authority,
            None,
            Vec::new(),
        )
    }

    /// Root name of a filesystem layered over the file named `outer`
    pub fn layered_root(scheme: &str, outer: &Name) -> Name {
        Name::from_parts(
            SegmentString::from(scheme.to_ascii_lowercase()),
            None,
            Some(outer.clone()),
            Vec::new(),
        )
    }

    pub(crate) fn from_parts(
        scheme: SegmentString,
        authority: Option<Authority>,
        outer: Option<Name>,
        segments: Vec<SegmentString>,
    ) -> Name {
        let mut path = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum::<usize>() + 1);
        if segments.is_empty() {
            path.push(SEPARATOR);
        }
        for segment in &segments {
            path.push(SEPARATOR);
            parse::escape_segment_into(&mut path, segment);
        }

        let uri = match (&outer, &authority) {
            (Some(outer), _) => format!("{}:{}!{}", scheme, outer.uri(), path),
            (None, Some(authority)) => format!("{}://{}{}", scheme, authority, path),
            (None, None) => format!("{}://{}", scheme, path),
        };

        Name(Arc::new(NameInner {
            scheme,
            authority,
            outer,
            segments,
            uri,
        }))
    }

    #[inline]
    pub fn scheme(&self) -> &str {
        &self.0.scheme
    }

    #[inline]
    pub fn authority(&self) -> Option<&Authority> {
        self.0.authority.as_ref()
    }

    /// Name of the file this name's filesystem is layered over
    #[inline]
    pub fn outer(&self) -> Option<&Name> {
        self.0.outer.as_ref()
    }

    /// Canonical URI string
    #[inline]
    pub fn uri(&self) -> &str {
        &self.0.uri
    }

    /// Normalized path segments below the root
    pub fn segments(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.0.segments.iter().map(|s| s.as_str())
    }

    /// Absolute path within the filesystem, always starting with `/`
    pub fn path(&self) -> String {
        if self.0.segments.is_empty() {
            return SEPARATOR.to_string();
        }
        let mut path = String::new();
        for segment in &self.0.segments {
            path.push(SEPARATOR);
            path.push_str(segment);
        }
        path
    }

    /// Last path segment; empty for a root name
    pub fn base_name(&self) -> &str {
        self.0.segments.last().map(|s| s.as_str()).unwrap_or("")
    }

    /// Extension of the base name without the dot, if any
    pub fn extension(&self) -> Option<&str> {
        let base = self.base_name();
        match base.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < base.len() => Some(&base[idx + 1..]),
            _ => None,
        }
    }

    /// Number of segments below the root
    #[inline]
    pub fn depth(&self) -> usize {
        self.0.segments.len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.segments.is_empty()
    }

    /// Root name of the filesystem this name lives in
    pub fn root(&self) -> Name {
        if self.is_root() {
            return self.clone();
        }
        Name::from_parts(
            self.0.scheme.clone(),
            self.0.authority.clone(),
            self.0.outer.clone(),
            Vec::new(),
        )
    }

    /// Parent name, `None` at the root
    pub fn parent(&self) -> Option<Name> {
        if self.is_root() {
            return None;
        }
        let segments = self.0.segments[..self.0.segments.len() - 1].to_vec();
        Some(Name::from_parts(
            self.0.scheme.clone(),
            self.0.authority.clone(),
            self.0.outer.clone(),
            segments,
        ))
    }

    /// Direct child with the given base name
    pub fn child(&self, base_name: &str) -> VfsResult<Name> {
        let reject = |reason: &str| {
            VfsError::malformed(
                format!("{}/{}", self.uri().trim_end_matches(SEPARATOR), base_name),
                reason,
            )
        };
        parse::validate_segment(base_name).map_err(reject)?;
        if base_name.is_empty() || base_name == "." || base_name == ".." {
            return Err(reject("child name must be a single plain segment"));
        }
        let mut segments = self.0.segments.clone();
        segments.push(SegmentString::from(base_name));
        Ok(Name::from_parts(
            self.0.scheme.clone(),
            self.0.authority.clone(),
            self.0.outer.clone(),
            segments,
        ))
    }

    /// True when both names live under the same filesystem root
    pub fn same_root(&self, other: &Name) -> bool {
        self.0.scheme == other.0.scheme
            && self.0.authority == other.0.authority
            && self.0.outer == other.0.outer
    }

    /// True when `self` lies strictly beneath `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Name) -> bool {
        self.same_root(ancestor)
            && self.0.segments.len() > ancestor.0.segments.len()
            && self.0.segments.starts_with(&ancestor.0.segments)
    }

    pub fn is_ancestor_of(&self, descendant: &Name) -> bool {
        descendant.is_descendant_of(self)
    }

    /// Path of `self` relative to `ancestor` (`""` when equal)
    pub fn relative_to(&self, ancestor: &Name) -> Option<String> {
        if self == ancestor {
            return Some(String::new());
        }
        if !self.is_descendant_of(ancestor) {
            return None;
        }
        let rest: Vec<&str> = self.0.segments[ancestor.0.segments.len()..]
            .iter()
            .map(|s| s.as_str())
            .collect();
        Some(rest.join("/"))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.uri == other.0.uri
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.uri.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.uri.cmp(&other.0.uri)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Name({})", self.uri())
    }
}

impl std::str::FromStr for Name {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::parse(s)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.uri())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Name::parse(&uri).map_err(serde::de::Error::custom)
    }
}
