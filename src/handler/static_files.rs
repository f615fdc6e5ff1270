//! GET and HEAD against files under the document root.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::http::mime::MimeTable;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Upper bound on the up-front body allocation; larger files grow the
/// buffer as they are read.
const MAX_PREALLOC: usize = 1 << 20;

/// Serves the whole file at `path`.
///
/// Open failure and directories are 404; a failed read is 500 and the
/// partial buffer is dropped.
pub async fn get(path: &Path, mime: &MimeTable) -> Response {
    let (mut file, size) = match open_regular(path).await {
        Some(opened) => opened,
        None => return Response::not_found(),
    };

    let mut body = Vec::with_capacity(initial_capacity(size));
    if let Err(e) = file.read_to_end(&mut body).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
        return Response::internal_error();
    }

    Response::ok(mime.resolve(path), body)
}

/// Same headers as [`get`] without reading the file.
pub async fn head(path: &Path, mime: &MimeTable) -> Response {
    match open_regular(path).await {
        Some((_, size)) => ResponseBuilder::new(StatusCode::Ok)
            .content_type(mime.resolve(path))
            .content_length(size)
            .build(),
        None => Response::not_found(),
    }
}

/// Opens `path` and returns it with its size, or `None` for anything that
/// cannot be served as a file.
async fn open_regular(path: &Path) -> Option<(File, u64)> {
    let file = File::open(path).await.ok()?;
    let meta = file.metadata().await.ok()?;
    if meta.is_dir() {
        tracing::debug!(path = %path.display(), "Refusing to serve a directory");
        return None;
    }
    Some((file, meta.len()))
}

/// Buffer size to reserve for a file whose metadata reports `size` bytes.
///
/// Sparse files and device nodes can report sizes that were never meant to
/// be allocated at once.
fn initial_capacity(size: u64) -> usize {
    usize::try_from(size).map_or(MAX_PREALLOC, |size| size.min(MAX_PREALLOC))
}
