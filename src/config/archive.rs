//! Archive and output configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Archive source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Path to the ZIM file
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Override for the path prefix article ids are resolved against.
    /// Discovered from the archive's main entry when unset.
    #[serde(default)]
    pub root_prefix: Option<String>,
}

/// Output tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for Markdown files and images
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Ordinals per shard directory
    #[serde(default = "default_shard_width")]
    pub shard_width: u64,
    /// Highest ordinal with a numbered shard; later ones go to `other`
    #[serde(default = "default_shard_limit")]
    pub shard_limit: u64,
}

fn default_shard_width() -> u64 {
    1000
}

fn default_shard_limit() -> u64 {
    10_000
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            shard_width: default_shard_width(),
            shard_limit: default_shard_limit(),
        }
    }
}
