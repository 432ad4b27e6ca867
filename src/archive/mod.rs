//! Read-only access to the offline archive container
//!
//! The batch pipeline consumes archives through the [`ArchiveReader`] trait:
//! articles are addressed by id relative to the archive's root path, binary
//! entries (images) by their path as it appears in article markup.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  ArchiveReader trait                  │
//! │  resolve(path)       -> raw entry bytes | absent      │
//! │  fetch_article(id)   -> root_path + id, UTF-8 text    │
//! │  fetch_image(path)   -> bytes, path-encoding variants │
//! └───────────────────────────────────────────────────────┘
//!            │                               │
//!            ▼                               ▼
//! ┌─────────────────────┐        ┌─────────────────────┐
//! │     ZimArchive      │        │    MemoryArchive    │
//! │ - mmap'd ZIM file   │        │ - path → bytes map  │
//! │ - xz/zstd clusters  │        │                     │
//! └─────────────────────┘        └─────────────────────┘
//! ```

mod memory;
mod zim;

pub use memory::MemoryArchive;
pub use zim::{ZimArchive, ZimHeader};

use crate::types::ArticleId;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Characters escaped when re-encoding an image path: everything except
/// ASCII alphanumerics, the unreserved marks `_ . - ~`, and the path
/// separators `/` and `:`.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/')
    .remove(b':');

/// Errors raised while opening or reading an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only view of an archive container
pub trait ArchiveReader {
    /// Path prefix that article ids are resolved against
    fn root_path(&self) -> &str;

    /// Look up an entry by its full path.
    ///
    /// Returns `Ok(None)` when no entry exists at `path`. An entry that
    /// exists with no content resolves to `Ok(Some(vec![]))`.
    fn resolve(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError>;

    /// Fetch an article's markup.
    ///
    /// The lookup path is the root path concatenated with the id. Content is
    /// decoded as UTF-8, replacing invalid sequences. An empty entry yields
    /// an empty string rather than `NotFound`.
    fn fetch_article(&self, id: &ArticleId) -> Result<String, ArchiveError> {
        let path = format!("{}{}", self.root_path(), id);
        debug!("Fetching article {} at {}", id, path);

        match self.resolve(&path)? {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            None => Err(ArchiveError::NotFound(path)),
        }
    }

    /// Fetch a binary entry such as an image.
    ///
    /// Tries the path as given, then percent-decoded, then percent-encoded,
    /// returning the first variant that resolves. Lookup errors on
    /// individual variants are logged and the next variant is tried; only
    /// exhausting every variant is reported.
    fn fetch_image(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        for candidate in path_variants(path) {
            debug!("Trying image path: {}", candidate);
            match self.resolve(&candidate) {
                Ok(Some(bytes)) => {
                    debug!("Image resolved at {} ({} bytes)", candidate, bytes.len());
                    return Ok(bytes);
                }
                Ok(None) => continue,
                Err(e) => {
                    debug!("Image path {} failed: {}", candidate, e);
                    continue;
                }
            }
        }

        warn!("All path variants failed for image: {}", path);
        Err(ArchiveError::NotFound(path.to_string()))
    }
}

impl<A: ArchiveReader + ?Sized> ArchiveReader for &A {
    fn root_path(&self) -> &str {
        (**self).root_path()
    }

    fn resolve(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        (**self).resolve(path)
    }
}

impl<A: ArchiveReader + ?Sized> ArchiveReader for Box<A> {
    fn root_path(&self) -> &str {
        (**self).root_path()
    }

    fn resolve(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        (**self).resolve(path)
    }
}

/// Candidate lookup paths for a binary entry, in the order they are tried:
/// as given, percent-decoded, percent-encoded. Duplicates are dropped.
pub fn path_variants(path: &str) -> Vec<String> {
    let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();
    let encoded = utf8_percent_encode(path, PATH_ENCODE_SET).to_string();

    let mut variants = Vec::with_capacity(3);
    for candidate in [path.to_string(), decoded, encoded] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
