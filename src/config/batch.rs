//! Batch run and tracking configuration

use crate::extract::ImagePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable state location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Directory holding `processing_status.json` and `failed_items.json`
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

/// Batch run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Id prefix, e.g. `scp` for `scp-001`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// First ordinal of the range
    #[serde(default = "default_start")]
    pub start: u64,
    /// Last ordinal of the range, inclusive
    #[serde(default = "default_end")]
    pub end: u64,
    /// Start from the tracker's resume point when it is past `start`
    #[serde(default = "default_true")]
    pub resume: bool,
    /// Stop after this many failures in a row
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Attempted items between summary blocks
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,
    /// Attempted items between progress rate refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Which images to extract per article
    #[serde(default)]
    pub image_policy: ImagePolicy,
    /// Extra CSS selectors stripped before conversion
    #[serde(default)]
    pub extra_denylist: Vec<String>,
}

fn default_prefix() -> String {
    "scp".to_string()
}

fn default_start() -> u64 {
    1
}

fn default_end() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_summary_interval() -> u64 {
    100
}

fn default_refresh_interval() -> u64 {
    10
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            start: default_start(),
            end: default_end(),
            resume: true,
            max_consecutive_failures: default_max_consecutive_failures(),
            summary_interval: default_summary_interval(),
            refresh_interval: default_refresh_interval(),
            image_policy: ImagePolicy::default(),
            extra_denylist: Vec::new(),
        }
    }
}
