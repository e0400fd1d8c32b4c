//! Job trait and associated types
//!
//! This module defines the contract every schedulable unit of work implements,
//! along with the decision and outcome types exchanged with the crawler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Largest allowed magnitude of a job priority
pub const MAX_ABS_PRIORITY: i32 = 1000;

/// Errors a job can report from `process()` or `after()`
///
/// The `Display` text is what ends up in the job's error history.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    /// Creates a plain failure with the given message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for job operations
pub type JobResult<T> = Result<T, JobError>;

/// Decision returned by [`Job::should_process`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShouldProcess {
    /// Nothing to do right now
    Skip,

    /// The job should run; the reason is only used for logging
    Run { reason: String },
}

impl ShouldProcess {
    pub fn run(reason: impl Into<String>) -> Self {
        Self::Run {
            reason: reason.into(),
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self, Self::Run { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Run { reason } => Some(reason),
            Self::Skip => None,
        }
    }
}

/// Marker produced by a successful `process()` call
///
/// The crawler never inspects it; it is handed back to the job through
/// [`Job::set_last`] so the job can base later freshness decisions on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastProcessed {
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl LastProcessed {
    /// Marker stamped with the current time
    pub fn now(version: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            version,
        }
    }
}

/// A named, independently schedulable unit of work
///
/// Implementations must keep `id()` stable across restarts, since persisted
/// history is keyed by it.
#[async_trait]
pub trait Job: Send {
    /// Unique identity of this job within a crawler
    fn id(&self) -> &str;

    /// Scheduling priority in `-1000..=1000`; higher runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Cheap check deciding whether the job needs to run now
    fn should_process(&self) -> ShouldProcess;

    /// Performs the unit of work
    ///
    /// `cancel` fires when the crawler shuts down or the per-job timeout
    /// elapses. Long-running implementations should watch it.
    async fn process(&mut self, cancel: CancellationToken) -> JobResult<LastProcessed>;

    /// Receives the marker returned by a successful `process()` call
    fn set_last(&mut self, _last: LastProcessed) {}

    /// Hook run once after a successful `process()`
    ///
    /// A failure here is logged but does not turn the attempt into a failure.
    async fn after(&mut self) -> JobResult<()> {
        Ok(())
    }
}
