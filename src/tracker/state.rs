//! Durable tracker records and their on-disk encoding

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::warn;

use super::TrackerError;

/// Counters for the current run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub start_time: Option<NaiveDateTime>,
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Everything the tracker persists in the status file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingState {
    pub last_run: Option<NaiveDateTime>,
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Completed ids in the order they first succeeded
    pub completed_items: Vec<String>,
    /// Ids whose latest outcome is a failure
    pub failed_items: Vec<String>,
    pub current_session: SessionStats,
    /// Ordinal of the last item the driver attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed_num: Option<u64>,
}

impl ProcessingState {
    /// Drop duplicate ids and any failed id that has also completed. Each
    /// distinct superseded id is taken off the failed counter. Returns the number of
    /// entries removed.
    pub fn normalize(&mut self) -> usize {
        let before = self.completed_items.len() + self.failed_items.len();

        let mut seen = std::collections::HashSet::new();
        self.completed_items.retain(|id| seen.insert(id.clone()));

        let completed = seen;
        let mut superseded = std::collections::HashSet::new();
        let mut seen = std::collections::HashSet::new();
        self.failed_items.retain(|id| {
            if completed.contains(id) {
                superseded.insert(id.clone());
                return false;
            }
            seen.insert(id.clone())
        });

        self.failed = self.failed.saturating_sub(superseded.len() as u64);

        before - (self.completed_items.len() + self.failed_items.len())
    }
}

/// One entry of the failure detail file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub scp_id: String,
    pub error: String,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Load a JSON file, falling back to the default when it is absent or
/// unreadable.
pub(crate) fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }

    let parsed = fs::read_to_string(path)
        .map_err(TrackerError::from)
        .and_then(|json| serde_json::from_str(&json).map_err(TrackerError::from));

    match parsed {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to load {}, starting empty: {}", path.display(), e);
            T::default()
        }
    }
}

/// Write JSON atomically using a temp file
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), TrackerError> {
    let json = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    fs::rename(temp_path, path)?;
    Ok(())
}
