//! MIME type detection based on file extensions.

use std::path::Path;

/// Maps the final extension of a file name to a content type.
#[derive(Debug, Clone)]
pub struct MimeTable {
    default: String,
}

impl MimeTable {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
        }
    }

    /// Content type for `path`, or the default when the extension is unknown
    /// or the file name has no `.` at all. Matching is case-sensitive.
    pub fn resolve(&self, path: &Path) -> &str {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .and_then(|(_, ext)| lookup(ext))
            .unwrap_or(&self.default)
    }

    pub fn default_type(&self) -> &str {
        &self.default
    }
}

/// Fixed extension table.
pub fn lookup(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}
