//! State module for tracking job progress
//!
//! This module provides the per-job records the crawler keeps between runs.
//!
//! # Components
//!
//! - `HistoryItem`: Outcome of a single attempt (success or error)
//! - `JobState`: Capped attempt history, retry deadline and fairness accumulator
//! - `JobStates`: The persisted snapshot, keyed by job id

mod history;
mod job_state;

// Re-export main types
pub use history::HistoryItem;
pub use job_state::{JobState, JobStates, HISTORY_SIZE};
