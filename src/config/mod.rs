//! Configuration for zimdown
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file,
//! environment variables (a `.env` file is loaded by the binary), CLI flags.

mod archive;
mod batch;
mod logging;

pub use archive::{ArchiveConfig, OutputConfig};
pub use batch::{BatchConfig, TrackingConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "zimdown.toml";

/// Environment variable holding the archive path
pub const ENV_ARCHIVE_PATH: &str = "SCP_OFFLINE_ZIM_PATH";
/// Environment variable holding the output root
pub const ENV_OUTPUT_DIR: &str = "SCP_MD_OUTPUT_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration:\n  - {0}")]
    Missing(String),

    #[error("Configuration validation failed:\n  - {0}")]
    Invalid(String),

    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file. Validation is left to the caller
    /// so that environment and CLI overrides can be applied first.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file if it exists, otherwise start from defaults
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        if let Some(root) = config.output.root.take() {
            config.set_output_root(root);
        }
        Ok(config)
    }

    /// Apply `SCP_OFFLINE_ZIM_PATH` and `SCP_MD_OUTPUT_DIR` from the process
    /// environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides through a lookup function. Empty values
    /// are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_ARCHIVE_PATH).filter(|v| !v.trim().is_empty()) {
            self.archive.path = Some(PathBuf::from(path.trim()));
        }
        if let Some(root) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.set_output_root(root.trim());
        }
    }

    /// Set the output root, dropping trailing separators
    pub fn set_output_root(&mut self, root: impl Into<PathBuf>) {
        self.output.root = Some(strip_trailing_separators(&root.into()));
    }

    /// Archive path, required
    pub fn archive_path(&self) -> Result<&Path, ConfigError> {
        self.archive
            .path
            .as_deref()
            .ok_or_else(|| ConfigError::Missing(missing_archive_message()))
    }

    /// Output root, required
    pub fn output_root(&self) -> Result<&Path, ConfigError> {
        self.output
            .root
            .as_deref()
            .ok_or_else(|| ConfigError::Missing(missing_output_message()))
    }

    /// Validate all configuration fields.
    ///
    /// Every problem is collected and reported together. Missing required
    /// paths take precedence as [`ConfigError::Missing`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        match &self.archive.path {
            None => missing.push(missing_archive_message()),
            Some(p) if p.as_os_str().is_empty() => missing.push(missing_archive_message()),
            _ => {}
        }
        match &self.output.root {
            None => missing.push(missing_output_message()),
            Some(p) if p.as_os_str().is_empty() => missing.push(missing_output_message()),
            _ => {}
        }

        if self.output.shard_width == 0 {
            errors.push("output.shard_width must be positive".to_string());
        }

        if self.tracking.state_dir.as_os_str().is_empty() {
            errors.push("tracking.state_dir must not be empty".to_string());
        }

        let prefix = &self.batch.prefix;
        if prefix.is_empty() {
            errors.push("batch.prefix must not be empty".to_string());
        } else if prefix.contains('/') || prefix.contains('\\') {
            errors.push(format!("batch.prefix must not contain path separators, got '{}'", prefix));
        }
        if self.batch.start == 0 {
            errors.push("batch.start must be at least 1".to_string());
        }
        if self.batch.start > self.batch.end {
            errors.push(format!(
                "batch.start ({}) must not exceed batch.end ({})",
                self.batch.start, self.batch.end
            ));
        }
        if self.batch.max_consecutive_failures == 0 {
            errors.push("batch.max_consecutive_failures must be positive".to_string());
        }
        if self.batch.summary_interval == 0 {
            errors.push("batch.summary_interval must be positive".to_string());
        }
        if self.batch.refresh_interval == 0 {
            errors.push("batch.refresh_interval must be positive".to_string());
        }

        if self.logging.file && self.logging.log_dir.as_os_str().is_empty() {
            errors.push("logging.log_dir must not be empty when file logging is on".to_string());
        }

        if !missing.is_empty() {
            missing.extend(errors);
            return Err(ConfigError::Missing(missing.join("\n  - ")));
        }
        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors.join("\n  - ")));
        }
        Ok(())
    }
}

fn missing_archive_message() -> String {
    format!("archive path (set {} or archive.path)", ENV_ARCHIVE_PATH)
}

fn missing_output_message() -> String {
    format!("output root (set {} or output.root)", ENV_OUTPUT_DIR)
}

/// Drop trailing `/` (and `\` on Windows) unless the path is only separators
fn strip_trailing_separators(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let trimmed = s.trim_end_matches(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR);
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn valid_config() -> Config {
        let mut cfg = Config::default();
        cfg.archive.path = Some(PathBuf::from("/data/scp.zim"));
        cfg.set_output_root("/data/md");
        cfg
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.batch.prefix, "scp");
        assert_eq!(cfg.batch.start, 1);
        assert_eq!(cfg.batch.end, 10_000);
        assert!(cfg.batch.resume);
        assert_eq!(cfg.batch.max_consecutive_failures, 10);
        assert_eq!(cfg.output.shard_width, 1000);
        assert_eq!(cfg.tracking.state_dir, PathBuf::from("logs"));
        assert_eq!(cfg.logging.level, LogLevel::Warn);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_reports_missing_paths_together() {
        let err = Config::default().validate().unwrap_err();
        match err {
            ConfigError::Missing(msg) => {
                assert!(msg.contains(ENV_ARCHIVE_PATH));
                assert!(msg.contains(ENV_OUTPUT_DIR));
            }
            other => panic!("expected Missing, got {:?}", other),
        }
    }

    #[test]
    fn validate_collects_invalid_fields() {
        let mut cfg = valid_config();
        cfg.batch.start = 50;
        cfg.batch.end = 10;
        cfg.batch.max_consecutive_failures = 0;

        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("batch.start (50) must not exceed batch.end (10)"));
        assert!(msg.contains("max_consecutive_failures must be positive"));
    }

    #[test]
    fn validate_rejects_prefix_with_separator() {
        let mut cfg = valid_config();
        cfg.batch.prefix = "a/b".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn env_overrides_and_strips_trailing_separator() {
        let mut cfg = Config::default();
        cfg.apply_env_from(env(&[
            (ENV_ARCHIVE_PATH, "/zims/scp.zim"),
            (ENV_OUTPUT_DIR, "/out/md/"),
        ]));

        assert_eq!(cfg.archive_path().unwrap(), Path::new("/zims/scp.zim"));
        assert_eq!(cfg.output_root().unwrap(), Path::new("/out/md"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = valid_config();
        cfg.apply_env_from(env(&[(ENV_ARCHIVE_PATH, "  ")]));
        assert_eq!(cfg.archive_path().unwrap(), Path::new("/data/scp.zim"));
    }

    #[test]
    fn strip_keeps_root() {
        assert_eq!(strip_trailing_separators(Path::new("/")), PathBuf::from("/"));
        assert_eq!(strip_trailing_separators(Path::new("out//")), PathBuf::from("out"));
    }

    #[test]
    fn load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zimdown.toml");
        std::fs::write(
            &path,
            r#"
[archive]
path = "/zims/scp.zim"
root_prefix = "A/"

[output]
root = "/out/"
shard_width = 500

[batch]
end = 20
image_policy = "all"
extra_denylist = [".rating-box"]

[logging]
level = "info"
"#,
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.archive.root_prefix.as_deref(), Some("A/"));
        assert_eq!(cfg.output.root, Some(PathBuf::from("/out")));
        assert_eq!(cfg.output.shard_width, 500);
        assert_eq!(cfg.output.shard_limit, 10_000);
        assert_eq!(cfg.batch.end, 20);
        assert_eq!(cfg.batch.image_policy, crate::extract::ImagePolicy::All);
        assert_eq!(cfg.batch.extra_denylist, vec![".rating-box"]);
        assert_eq!(cfg.logging.level, LogLevel::Info);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_optional_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_optional(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.batch.end, 10_000);
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[batch\nend = ").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
