use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_tmp_dir_name() -> String {
    ".tmp".to_string()
}

fn default_worker_count() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_job_persist_interval() -> usize {
    hf_jobs::DEFAULT_PERSIST_EVERY
}

/// In-process engine configuration (SPEC_FULL §B). Not the external
/// request-time config a transport layer would load — that surface is out
/// of scope (spec §1) — this is what [`crate::IngestService::new`] needs to
/// stand the engine up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Repository root; every path in `StorageManager` is relative to this.
    pub root: PathBuf,
    /// Name of the scratch subdirectory under `storage/` used for in-flight
    /// writes before they're renamed into place.
    #[serde(default = "default_tmp_dir_name")]
    pub tmp_dir_name: String,
    /// Number of `JobQueue` worker tasks (spec §4.8, §5).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Bounded channel capacity for queued jobs.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Items processed between job-progress persists (spec §4.8: "N=10").
    #[serde(default = "default_job_persist_interval")]
    pub job_persist_interval: usize,
}

impl Config {
    /// Reads and parses a TOML config file. `root` is left as parsed (may be
    /// relative to the process's current directory) since interpreting it
    /// relative to the config file's location is a transport-layer concern.
    pub async fn load_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;
        toml::from_str(&bytes).map_err(ConfigError::Parse)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            tmp_dir_name: default_tmp_dir_name(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            job_persist_interval: default_job_persist_interval(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
}
