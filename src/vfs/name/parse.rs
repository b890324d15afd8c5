/*!
 * Name Parsing
 * URI string -> canonical Name
 */

use smartstring::alias::String as SegmentString;

use super::{Authority, Name, SEPARATOR};
use crate::vfs::types::{VfsError, VfsResult};

/// Why a path could not be normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum NormalizeError {
    /// A `..` segment climbed above the root
    AboveRoot,
    /// A segment contains a forbidden character
    IllegalSegment(&'static str),
}

/// True when `text` starts with a URI scheme followed by `:`
///
/// Schemes are at least two characters so that `C:\dir` style paths are
/// never mistaken for one.
pub fn has_scheme(text: &str) -> bool {
    scheme_len(text).is_some()
}

fn scheme_len(text: &str) -> Option<usize> {
    let colon = text.find(':')?;
    let scheme = &text[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || scheme.len() < 2 {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(colon)
    } else {
        None
    }
}

/// Check a single path segment for forbidden characters
pub(super) fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.contains('\0') {
        return Err("path segments cannot contain null bytes");
    }
    if segment.contains(SEPARATOR) || segment.contains('\\') {
        return Err("path segments cannot contain separators");
    }
    Ok(())
}

/// Append `segment` to a URI, escaping the layer separator and the escape character
pub(super) fn escape_segment_into(uri: &mut String, segment: &str) {
    for c in segment.chars() {
        match c {
            '!' => uri.push_str("%21"),
            '%' => uri.push_str("%25"),
            c => uri.push(c),
        }
    }
}

/// Undo `escape_segment_into`; other `%` sequences are kept as written
fn unescape_segment(segment: &str) -> SegmentString {
    if !segment.contains('%') {
        return SegmentString::from(segment);
    }
    let mut out = SegmentString::new();
    let mut rest = segment;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if tail.starts_with("%21") {
            out.push('!');
            rest = &tail[3..];
        } else if tail.starts_with("%25") {
            out.push('%');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Apply `path` on top of `segments`, removing `.` and resolving `..`
pub(super) fn normalize_into(
    segments: &mut Vec<SegmentString>,
    path: &str,
) -> Result<(), NormalizeError> {
    for part in path.split(SEPARATOR) {
        match part {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(NormalizeError::AboveRoot);
                }
            }
            segment => {
                validate_segment(segment).map_err(NormalizeError::IllegalSegment)?;
                segments.push(SegmentString::from(segment));
            }
        }
    }
    Ok(())
}

fn parse_authority(uri: &str, raw: &str) -> VfsResult<Option<Authority>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let (user_info, host_port) = match raw.rfind('@') {
        Some(idx) => (Some(&raw[..idx]), &raw[idx + 1..]),
        None => (None, raw),
    };

    let (host, port) = if let Some(rest) = host_port.strip_prefix('[') {
        // IPv6 literal
        let end = rest
            .find(']')
            .ok_or_else(|| VfsError::malformed(uri, "unterminated IPv6 host"))?;
        let host = &host_port[..end + 2];
        let after = &rest[end + 1..];
        match after.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if after.is_empty() => (host, None),
            None => return Err(VfsError::malformed(uri, "unexpected text after IPv6 host")),
        }
    } else {
        match host_port.rfind(':') {
            Some(idx) => (&host_port[..idx], Some(&host_port[idx + 1..])),
            None => (host_port, None),
        }
    };

    if host.is_empty() {
        return Err(VfsError::malformed(uri, "authority has an empty host"));
    }
    if host.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(VfsError::malformed(uri, "host contains illegal characters"));
    }

    let mut authority = Authority::new(host);
    if let Some(user_info) = user_info {
        if user_info.is_empty() {
            return Err(VfsError::malformed(uri, "authority has empty user info"));
        }
        authority = authority.with_user_info(user_info);
    }
    if let Some(port) = port {
        let port: u16 = port
            .parse()
            .map_err(|_| VfsError::malformed(uri, format!("invalid port {:?}", port)))?;
        authority = authority.with_port(port);
    }
    Ok(Some(authority))
}

/// Parse a scheme-qualified URI
pub(super) fn parse(uri: &str) -> VfsResult<Name> {
    if uri.is_empty() {
        return Err(VfsError::malformed("<empty>", "name is empty"));
    }
    let colon =
        scheme_len(uri).ok_or_else(|| VfsError::malformed(uri, "missing or invalid scheme"))?;

    let scheme = SegmentString::from(uri[..colon].to_ascii_lowercase());
    let rest = uri[colon + 1..].replace('\\', "/");

    let (authority, outer, path) = if let Some(after) = rest.strip_prefix("//") {
        let end = after.find(SEPARATOR).unwrap_or(after.len());
        let authority = parse_authority(uri, &after[..end])?;
        (authority, None, after[end..].to_string())
    } else if !rest.starts_with(SEPARATOR) && rest.contains('!') {
        // Layered: scheme:<outer-uri>!/path
        let bang = rest.rfind('!').unwrap_or(rest.len());
        let outer = parse(&rest[..bang])?;
        (None, Some(outer), rest[bang + 1..].to_string())
    } else if has_scheme(&rest) {
        return Err(VfsError::malformed(uri, "layered name is missing the `!` separator"));
    } else {
        (None, None, rest)
    };

    let mut segments = Vec::new();
    normalize_into(&mut segments, &path).map_err(|err| match err {
        NormalizeError::AboveRoot => VfsError::InvalidRelativePath {
            base: format!("{}:///", scheme),
            path: path.clone(),
        },
        NormalizeError::IllegalSegment(reason) => VfsError::malformed(uri, reason),
    })?;
    let segments = segments.iter().map(|s| unescape_segment(s)).collect();

    Ok(Name::from_parts(scheme, authority, outer, segments))
}
