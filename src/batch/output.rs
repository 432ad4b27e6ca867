//! Output filesystem layout
//!
//! ```text
//! <root>/
//!   001-1000/scp-001.md
//!   1001-2000/scp-1001.md
//!   other/scp-10001.md
//!   images/...            (image paths as referenced by the article)
//! ```

use crate::types::ArticleId;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Label of the shard holding ordinals outside the numbered buckets
pub const OVERFLOW_SHARD: &str = "other";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("refusing to write outside the output root: {0}")]
    UnsafePath(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fixed-width numeric buckets for article files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardLayout {
    width: u64,
    limit: u64,
}

impl Default for ShardLayout {
    fn default() -> Self {
        Self {
            width: 1000,
            limit: 10_000,
        }
    }
}

impl ShardLayout {
    /// `width` is clamped to at least 1
    pub fn new(width: u64, limit: u64) -> Self {
        Self {
            width: width.max(1),
            limit,
        }
    }

    /// Shard directory name for an ordinal: `001-1000`, `1001-2000`, ...,
    /// or `other` for 0 and ordinals past the limit
    pub fn shard_for(&self, ordinal: u64) -> String {
        if ordinal == 0 || ordinal > self.limit {
            return OVERFLOW_SHARD.to_string();
        }

        let bucket = (ordinal - 1) / self.width;
        let low = bucket * self.width + 1;
        let high = (bucket + 1) * self.width;
        format!("{:03}-{}", low, high)
    }
}

/// Where articles and images are written
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    shards: ShardLayout,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, shards: ShardLayout) -> Self {
        Self {
            root: root.into(),
            shards,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shard_for(&self, id: &ArticleId) -> String {
        self.shards.shard_for(id.ordinal())
    }

    pub fn article_path(&self, id: &ArticleId) -> PathBuf {
        self.root
            .join(self.shard_for(id))
            .join(format!("{}.md", id))
    }

    /// Write an article's Markdown, creating its shard directory
    pub fn write_article(&self, id: &ArticleId, markdown: &str) -> Result<PathBuf, OutputError> {
        let path = self.article_path(id);
        write_file(&path, markdown.as_bytes())?;
        Ok(path)
    }

    /// Destination of an image under the output root. Absolute paths and
    /// paths with `..` components are refused.
    pub fn image_path(&self, relative: &str) -> Result<PathBuf, OutputError> {
        let rel = Path::new(relative);
        let safe = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !safe {
            return Err(OutputError::UnsafePath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }

    /// Write image bytes unchanged, creating intermediate directories
    pub fn write_image(&self, relative: &str, bytes: &[u8]) -> Result<PathBuf, OutputError> {
        let path = self.image_path(relative)?;
        write_file(&path, bytes)?;
        Ok(path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shard_labels() {
        let shards = ShardLayout::default();
        assert_eq!(shards.shard_for(1), "001-1000");
        assert_eq!(shards.shard_for(1000), "001-1000");
        assert_eq!(shards.shard_for(1001), "1001-2000");
        assert_eq!(shards.shard_for(9999), "9001-10000");
        assert_eq!(shards.shard_for(10_000), "9001-10000");
        assert_eq!(shards.shard_for(10_001), "other");
        assert_eq!(shards.shard_for(0), "other");
    }

    #[test]
    fn test_custom_shard_width() {
        let shards = ShardLayout::new(100, 500);
        assert_eq!(shards.shard_for(42), "001-100");
        assert_eq!(shards.shard_for(101), "101-200");
        assert_eq!(shards.shard_for(501), "other");
    }

    #[test]
    fn test_article_path() {
        let layout = OutputLayout::new("/out", ShardLayout::default());
        assert_eq!(
            layout.article_path(&ArticleId::new("scp", 1500)),
            PathBuf::from("/out/1001-2000/scp-1500.md")
        );
    }

    #[test]
    fn test_write_article_creates_shard() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path(), ShardLayout::default());

        let path = layout
            .write_article(&ArticleId::new("item", 1), "Hello\n")
            .unwrap();
        assert_eq!(path, dir.path().join("001-1000").join("item-001.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "Hello\n");
    }

    #[test]
    fn test_write_image_nested() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path(), ShardLayout::default());

        let path = layout.write_image("images/sub/x.png", &[0x89, 0x50]).unwrap();
        assert_eq!(fs::read(path).unwrap(), vec![0x89, 0x50]);
    }

    #[test]
    fn test_image_path_refuses_escape() {
        let layout = OutputLayout::new("/out", ShardLayout::default());

        for bad in ["../x.png", "images/../../x.png", "/etc/passwd", ""] {
            assert!(
                matches!(layout.image_path(bad), Err(OutputError::UnsafePath(_))),
                "{} should be refused",
                bad
            );
        }
        assert!(layout.image_path("./images/x.png").is_ok());
    }
}
