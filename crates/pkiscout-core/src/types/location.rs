//! Where a resource was found.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A file path plus the 1-based position of the block inside the file.
///
/// The index is only present when the file produced more than one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// File the resource was read from
    pub path: PathBuf,
    /// Position inside a multi-block file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Location {
    /// Location of the only resource in a file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: None,
        }
    }

    /// Location of one block inside a multi-block file
    pub fn with_index(path: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            path: path.into(),
            index: Some(index),
        }
    }

    /// The location-root: path without index and without file extension.
    ///
    /// Siblings such as `c.pem` and `c.pub` share the root `.../c`.
    #[must_use]
    pub fn root(&self) -> String {
        strip_extension(&self.path)
    }

    /// File name as a string, if it has one
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}:{index}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Strip the positional index and the file extension from a location string.
///
/// ```
/// use pkiscout_core::strip_location;
///
/// assert_eq!(strip_location("/a/b/key.pem:2"), "/a/b/key");
/// assert_eq!(strip_location("/a/b/key"), "/a/b/key");
/// ```
#[must_use]
pub fn strip_location(location: &str) -> String {
    let path = match location.rsplit_once(':') {
        Some((head, tail))
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => location,
    };
    strip_extension(Path::new(path))
}

fn strip_extension(path: &Path) -> String {
    if path.extension().is_some() {
        path.with_extension("").to_string_lossy().into_owned()
    } else {
        path.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_index_and_extension() {
        assert_eq!(strip_location("/a/b/key.pem:2"), "/a/b/key");
        assert_eq!(strip_location("/a/b/key.pem"), "/a/b/key");
        assert_eq!(strip_location("/a/b/key"), "/a/b/key");
    }

    #[test]
    fn strip_keeps_dots_in_directories() {
        assert_eq!(strip_location("/etc/ssl.d/server"), "/etc/ssl.d/server");
        assert_eq!(strip_location("/etc/ssl.d/server.crt:10"), "/etc/ssl.d/server");
    }

    #[test]
    fn strip_only_drops_last_extension() {
        assert_eq!(strip_location("/k/ec.key.der"), "/k/ec.key");
    }

    #[test]
    fn strip_ignores_non_numeric_suffix() {
        assert_eq!(strip_location("alice"), "alice");
        assert_eq!(strip_location("host:name"), "host:name");
    }

    #[test]
    fn hidden_file_has_no_extension() {
        let loc = Location::new("/keys/.secret");
        assert_eq!(loc.root(), "/keys/.secret");
    }

    #[test]
    fn display_includes_index_only_when_set() {
        assert_eq!(Location::new("/a/key.pem").to_string(), "/a/key.pem");
        assert_eq!(
            Location::with_index("/a/bundle.pem", 3).to_string(),
            "/a/bundle.pem:3"
        );
    }

    #[test]
    fn root_matches_stripped_display() {
        let loc = Location::with_index("/a/b/key.pem", 2);
        assert_eq!(loc.root(), strip_location(&loc.to_string()));
    }
}
