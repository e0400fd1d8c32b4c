//! Candidate queue and fairness ranking
//!
//! Runnable jobs are ordered by a single key combining priority and the time
//! the job consumed recently:
//!
//! ```text
//! key = -PRIORITY_WEIGHT * priority + total_duration
//! ```
//!
//! Lower keys run first. Each priority step is worth `PRIORITY_WEIGHT` seconds
//! of accumulated duration, so within a priority the job that used the least
//! time recently wins.

use std::cmp::Ordering;

/// Seconds of accumulated duration equivalent to one priority step
///
/// A job whose recent total duration exceeds this can be overtaken by a job
/// one priority level lower.
pub const PRIORITY_WEIGHT: f64 = 1000.0;

/// Computes the ranking key for a job
pub fn rank_key(priority: i32, total_duration: f64) -> f64 {
    -PRIORITY_WEIGHT * f64::from(priority) + total_duration
}

/// A job selected to run in the current iteration
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position of the job in the crawler's registry
    pub index: usize,

    /// Job id
    pub id: String,

    /// Why the job is running (advisory, logged)
    pub reason: String,

    /// Ranking key, lower runs first
    pub key: f64,
}

impl Candidate {
    pub fn new(
        index: usize,
        id: &str,
        priority: i32,
        total_duration: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: id.to_string(),
            reason: reason.into(),
            key: rank_key(priority, total_duration),
        }
    }
}

// Ascending by key, ties broken by id so the order is reproducible
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Orders candidates and keeps the first `batch_size`
pub fn take_batch(mut candidates: Vec<Candidate>, batch_size: usize) -> Vec<Candidate> {
    candidates.sort();
    candidates.truncate(batch_size);
    candidates
}
