//! In-memory archive

use super::{ArchiveError, ArchiveReader};
use std::collections::HashMap;

/// Archive backed by a path → bytes map
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    root_path: String,
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// Create an empty archive whose articles live under `root_path`
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            entries: HashMap::new(),
        }
    }

    /// Add an entry at its full path
    pub fn with_entry(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add an article under the root path
    pub fn with_article(self, id: &crate::types::ArticleId, html: impl Into<Vec<u8>>) -> Self {
        let path = format!("{}{}", self.root_path, id);
        self.with_entry(path, html)
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), content.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveReader for MemoryArchive {
    fn root_path(&self) -> &str {
        &self.root_path
    }

    fn resolve(&self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        Ok(self.entries.get(path).cloned())
    }
}
