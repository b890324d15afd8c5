/*!
 * Relative Name Resolution
 */

use super::parse::{self, NormalizeError};
use super::{Name, SEPARATOR};
use crate::vfs::types::{VfsError, VfsResult};

impl Name {
    /// Resolve `path` against this name, treated as a directory
    ///
    /// A leading separator replaces the whole path but keeps scheme, authority
    /// and outer name. Scheme-qualified strings are rejected here; the manager
    /// parses those fresh against its registry.
    pub fn resolve(&self, path: &str) -> VfsResult<Name> {
        if parse::has_scheme(path) {
            return Err(VfsError::malformed(
                path,
                "scheme-qualified names must be resolved through the manager",
            ));
        }

        let path = path.replace('\\', "/");
        let mut segments = if path.starts_with(SEPARATOR) {
            Vec::new()
        } else {
            self.0.segments.clone()
        };

        parse::normalize_into(&mut segments, &path).map_err(|err| match err {
            NormalizeError::AboveRoot => VfsError::InvalidRelativePath {
                base: self.uri().to_string(),
                path: path.clone(),
            },
            NormalizeError::IllegalSegment(reason) => VfsError::malformed(
                format!("{}/{}", self.uri().trim_end_matches(SEPARATOR), path),
                reason,
            ),
        })?;

        Ok(Name::from_parts(
            self.0.scheme.clone(),
            self.0.authority.clone(),
            self.0.outer.clone(),
            segments,
        ))
    }
}
