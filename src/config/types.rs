use serde::Deserialize;

/// Main configuration structure for Sumi-Scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobEntry>,
}

/// Scheduler loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Crawler identity, used for logging and to key persisted state
    pub id: String,

    /// Version stamped on every history item
    pub version: u32,

    /// Maximum number of jobs processed per loop iteration
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Sleep between iterations that found nothing to run (seconds)
    #[serde(rename = "idle-sleep", default = "default_idle_sleep")]
    pub idle_sleep: u64,

    /// Delay before the first retry of a failed job (seconds)
    #[serde(rename = "retry-timeout", default = "default_retry_timeout")]
    pub retry_timeout: u64,

    /// Upper bound for the retry delay (seconds)
    #[serde(rename = "max-retry-timeout", default = "default_max_retry_timeout")]
    pub max_retry_timeout: u64,

    /// Per-job execution limit (seconds); unlimited when absent
    #[serde(rename = "job-timeout", default)]
    pub job_timeout: Option<u64>,

    /// Job ids to run unconditionally, ignoring backoff and freshness
    #[serde(default)]
    pub focus: Vec<String>,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory holding the snapshot and the error summary
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

/// Where snapshots are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

/// A shell command run whenever its last result is older than `max_age`
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    pub id: String,

    #[serde(default)]
    pub priority: i32,

    /// Command line passed to `sh -c`
    pub command: String,

    /// Seconds a successful run stays fresh
    #[serde(rename = "max-age")]
    pub max_age: u64,

    /// Optional command run after each successful `command`
    #[serde(default)]
    pub after: Option<String>,
}

fn default_batch_size() -> usize {
    5
}

fn default_idle_sleep() -> u64 {
    5 * 60
}

fn default_retry_timeout() -> u64 {
    5 * 60
}

fn default_max_retry_timeout() -> u64 {
    4 * 60 * 60
}

fn default_data_dir() -> String {
    "./data".to_string()
}
