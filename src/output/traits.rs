//! Output handler traits and types
//!
//! This module defines the trait interface for the error-summary sink and
//! the summary shape it receives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Latest error of a job that keeps failing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrorSummary {
    /// Message of the most recent failure
    pub error: String,

    /// Consecutive failures so far
    pub count: u32,
}

/// Error summaries keyed by job id
pub type JobErrors = BTreeMap<String, JobErrorSummary>;

/// Trait for error-summary sinks
///
/// Called after every persisted batch. Failures are logged by the crawler and
/// never stop the loop.
pub trait ErrorReporter: Send {
    /// Publishes the current error summary of a crawler
    ///
    /// # Arguments
    ///
    /// * `crawler_id` - The crawler whose jobs are summarized
    /// * `errors` - Jobs with persistent failures; may be empty
    fn report(&mut self, crawler_id: &str, errors: &JobErrors) -> OutputResult<()>;
}
