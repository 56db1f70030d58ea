//! Resolving a parsed request's URL to a file under the document root.
//!
//! Once a request is fully parsed, its URL names a path relative to the
//! document root; this module maps that path to an open, `mmap`-backed
//! file (or decides why it can't).

use crate::parser::HttpCode;
use memmap2::Mmap;
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

/// A request target resolved to a world-readable, regular file, ready to
/// be served.
pub struct Resource {
    pub real_path: PathBuf,
    pub mmap: Mmap,
    pub len: u64,
}

/// Resolve `url` (a request target starting with `/`) against
/// `document_root`.
///
/// Returns `Err` with the [`HttpCode`] the caller should respond with:
/// `BadRequest` for a path that escapes the document root or names a
/// directory, `NoResource` if nothing exists there, `Forbidden` if it
/// exists but isn't world-readable, and `InternalError` if opening or
/// mapping a readable file still fails.
pub fn resolve(document_root: &Path, url: &str) -> Result<Resource, HttpCode> {
    let relative = url.trim_start_matches('/');
    let rel_path = Path::new(relative);

    if rel_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(HttpCode::BadRequest);
    }

    let real_path = document_root.join(rel_path);

    let metadata = std::fs::metadata(&real_path).map_err(|_| HttpCode::NoResource)?;

    if metadata.is_dir() {
        return Err(HttpCode::BadRequest);
    }

    const S_IROTH: u32 = 0o004;
    if metadata.mode() & S_IROTH == 0 {
        return Err(HttpCode::Forbidden);
    }

    let file = File::open(&real_path).map_err(|_| HttpCode::InternalError)?;
    // SAFETY: the file is opened read-only and is not expected to be
    // truncated concurrently with being served; the document root is
    // assumed to hold static content for the server's lifetime.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|_| HttpCode::InternalError)?;

    Ok(Resource {
        real_path,
        mmap,
        len: metadata.len(),
    })
}
