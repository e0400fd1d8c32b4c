use crate::state::HistoryItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of attempts kept per job
pub const HISTORY_SIZE: usize = 5;

/// Persisted mapping from job id to its state
pub type JobStates = BTreeMap<String, JobState>;

/// Scheduler-owned record of a job's recent attempts
///
/// `history` is newest-first and never longer than [`HISTORY_SIZE`].
/// `total_duration` always equals the sum of the durations in `history`; it is
/// the fairness accumulator used when ranking jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    #[serde(default)]
    history: Vec<HistoryItem>,

    /// Earliest time the job may be reconsidered after a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_at: Option<DateTime<Utc>>,

    #[serde(default)]
    total_duration: f64,
}

impl JobState {
    /// Creates an empty state for a job that has never run
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent attempts, newest first
    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    /// Sum of durations over the recorded history, in seconds
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Prepends an attempt, evicting the oldest one past the cap
    pub fn record(&mut self, item: HistoryItem) {
        self.history.insert(0, item);
        self.history.truncate(HISTORY_SIZE);
        self.recompute_total_duration();
    }

    /// Number of error items at the head of the history
    ///
    /// Counting stops at the first success, so a single success resets it.
    pub fn consecutive_failures(&self) -> u32 {
        self.history.iter().take_while(|item| item.is_error()).count() as u32
    }

    /// Checks if the job is still inside its retry window
    pub fn is_waiting(&self, now: DateTime<Utc>) -> bool {
        self.retry_at.is_some_and(|retry_at| retry_at > now)
    }

    /// Message of the most recent attempt, if it failed
    pub fn last_error(&self) -> Option<&str> {
        self.history.first().and_then(HistoryItem::message)
    }

    /// Time of the most recent attempt
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.history.first().map(HistoryItem::timestamp)
    }

    /// Prepares a persisted state for a fresh process
    ///
    /// Pending backoff is forgiven and the accumulator is rebuilt from the
    /// history, so a hand-edited or truncated snapshot cannot break it.
    pub fn restore(&mut self) {
        self.retry_at = None;
        self.history.truncate(HISTORY_SIZE);
        self.recompute_total_duration();
    }

    fn recompute_total_duration(&mut self) {
        self.total_duration = self.history.iter().map(HistoryItem::duration).sum();
    }
}
