//! Sumi-Scheduler: a fair, restart-safe job loop for crawlers
//!
//! This crate implements the scheduling core of a crawler: it repeatedly asks a
//! set of registered jobs whether they need to run, ranks the runnable ones by
//! priority and recent cost, executes a small batch, backs off failing jobs
//! exponentially, and persists per-job history so a restart picks up where the
//! previous process left off.

pub mod config;
pub mod crawler;
pub mod job;
pub mod jobs;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Sumi-Scheduler operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Duplicate job id: {0}")]
    DuplicateJob(String),

    #[error("Priority of job '{id}' must be within -1000..=1000, got {priority}")]
    PriorityOutOfRange { id: String, priority: i32 },

    #[error("Focus references unknown job: {0}")]
    UnknownFocusJob(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Sumi-Scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, CrawlerSettings};
pub use job::{Job, JobError, LastProcessed, ShouldProcess};
pub use state::{HistoryItem, JobState, JobStates};
