//! Statistics generation from a persisted snapshot
//!
//! This module provides functionality for extracting and displaying
//! per-job statistics from the stored job states.

use crate::state::JobStates;
use chrono::{DateTime, Utc};

/// Statistics for a single job
#[derive(Debug, Clone)]
pub struct JobStatistics {
    pub id: String,

    /// Successful attempts in the recorded history
    pub successes: usize,

    /// Failed attempts in the recorded history
    pub errors: usize,

    /// Failures since the last success
    pub consecutive_failures: u32,

    /// Fairness accumulator, in seconds
    pub total_duration: f64,

    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub retry_at: Option<DateTime<Utc>>,
}

/// Crawler-wide statistics
#[derive(Debug, Clone)]
pub struct CrawlerStatistics {
    pub jobs: Vec<JobStatistics>,
}

impl CrawlerStatistics {
    /// Number of jobs whose latest attempt failed
    pub fn failing_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.consecutive_failures > 0)
            .count()
    }

    /// Number of jobs that have never run
    pub fn never_run(&self) -> usize {
        self.jobs.iter().filter(|job| job.last_run.is_none()).count()
    }
}

/// Builds statistics from a snapshot
pub fn load_statistics(states: &JobStates) -> CrawlerStatistics {
    let jobs = states
        .iter()
        .map(|(id, state)| {
            let errors = state.history().iter().filter(|item| item.is_error()).count();
            JobStatistics {
                id: id.clone(),
                successes: state.history().len() - errors,
                errors,
                consecutive_failures: state.consecutive_failures(),
                total_duration: state.total_duration(),
                last_run: state.last_run(),
                last_error: state.last_error().map(str::to_string),
                retry_at: state.retry_at,
            }
        })
        .collect();

    CrawlerStatistics { jobs }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlerStatistics) {
    println!("=== Crawler Statistics ===\n");

    println!("Overview:");
    println!("  Jobs tracked: {}", stats.jobs.len());
    println!("  Currently failing: {}", stats.failing_jobs());
    println!("  Never run: {}", stats.never_run());
    println!();

    println!(
        "{:<24} {:>4} {:>4} {:>6} {:>10}  {:<20}",
        "Job", "ok", "err", "streak", "duration", "last run"
    );

    // Busiest jobs first, they are the ones being deprioritized
    let mut jobs: Vec<_> = stats.jobs.iter().collect();
    jobs.sort_by(|a, b| b.total_duration.total_cmp(&a.total_duration));

    for job in jobs {
        let last_run = job
            .last_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{:<24} {:>4} {:>4} {:>6} {:>9.1}s  {:<20}",
            job.id, job.successes, job.errors, job.consecutive_failures, job.total_duration, last_run
        );

        if let Some(error) = &job.last_error {
            println!("    last error: {}", error);
        }
        if let Some(retry_at) = job.retry_at {
            println!("    retry at:   {}", retry_at.format("%Y-%m-%d %H:%M:%S"));
        }
    }
}
