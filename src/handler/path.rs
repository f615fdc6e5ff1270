//! Request path to filesystem path resolution.

use std::fmt;
use std::path::PathBuf;

/// Why a request path was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path tries to leave the document root
    Traversal(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Traversal(path) => write!(f, "path traversal attempt: {}", path),
        }
    }
}

impl std::error::Error for PathError {}

/// The directory every servable path is resolved under.
///
/// Resolution is pure string work: no I/O, no canonicalisation and no
/// symlink handling.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    root: String,
    index: String,
}

impl DocumentRoot {
    pub fn new(root: impl Into<String>, index: impl Into<String>) -> Self {
        let mut root = root.into();
        if root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        Self {
            root,
            index: index.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Joins `path` onto the root, mapping `/` to the index file.
    ///
    /// Paths containing `../`, `./` or `//`, or any segment equal to `..` or
    /// `.`, are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        if is_traversal(path) {
            return Err(PathError::Traversal(path.to_string()));
        }

        let resolved = if path == "/" {
            format!("{}/{}", self.root, self.index)
        } else {
            format!("{}{}", self.root, path)
        };

        Ok(PathBuf::from(resolved))
    }
}

/// Traversal rule shared by every method handler.
pub fn is_traversal(path: &str) -> bool {
    path.contains("../")
        || path.contains("./")
        || path.contains("//")
        || path.split('/').any(|segment| segment == ".." || segment == ".")
}
