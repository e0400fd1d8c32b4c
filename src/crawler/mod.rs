//! Crawler module for job scheduling and execution
//!
//! This module contains the core scheduling logic, including:
//! - Exponential backoff for failing jobs
//! - Candidate ranking by priority and recent duration
//! - The batch loop that runs jobs and persists their history

mod backoff;
mod coordinator;
mod queue;

pub use backoff::{retry_delay, DEFAULT_MAX_RETRY_TIMEOUT, DEFAULT_RETRY_TIMEOUT};
pub use coordinator::{Crawler, CrawlerSettings, DEFAULT_BATCH_SIZE, DEFAULT_IDLE_SLEEP};
pub use queue::{rank_key, take_batch, Candidate, PRIORITY_WEIGHT};

use crate::config::Config;
use crate::job::Job;
use crate::jobs::CommandJob;
use crate::output::JsonErrorReport;
use crate::storage::open_store;
use crate::SchedulerError;
use std::path::Path;

/// Builds a crawler from a validated configuration
///
/// Every `[[job]]` entry becomes a [`CommandJob`] whose last-run marker lives
/// in `{data-dir}/{id}-jobs/`. The snapshot store follows `[storage]`, and the
/// error summary is written next to it.
///
/// # Arguments
///
/// * `config` - The scheduler configuration
///
/// # Returns
///
/// * `Ok(Crawler)` - Crawler ready to `load()` and `run()`
/// * `Err(SchedulerError)` - Storage could not be opened or the job registry
///   is invalid
pub fn build_crawler(config: &Config) -> Result<Crawler, SchedulerError> {
    let settings = CrawlerSettings::from_config(&config.crawler);
    let data_dir = Path::new(&config.storage.data_dir);
    let marker_dir = data_dir.join(format!("{}-jobs", settings.id));

    let jobs: Vec<Box<dyn Job>> = config
        .jobs
        .iter()
        .map(|entry| {
            Box::new(CommandJob::from_config(entry, settings.version, &marker_dir)) as Box<dyn Job>
        })
        .collect();

    let store = open_store(&config.storage, &settings.id)?;
    let reporter = JsonErrorReport::new(data_dir);

    Crawler::new(settings, jobs, store, Box::new(reporter))
}
