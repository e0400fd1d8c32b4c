//! Error summary collection and the JSON file sink

use crate::output::traits::{ErrorReporter, JobErrorSummary, JobErrors, OutputResult};
use crate::state::JobStates;
use crate::storage::write_atomic;
use std::path::{Path, PathBuf};

/// Consecutive failures a job must exceed before it shows up in the summary
pub const REPORT_THRESHOLD: u32 = 2;

/// Collects the latest error of every job failing more than twice in a row
pub fn collect_errors(states: &JobStates) -> JobErrors {
    states
        .iter()
        .filter_map(|(id, state)| {
            let count = state.consecutive_failures();
            if count <= REPORT_THRESHOLD {
                return None;
            }

            let error = state.last_error()?.to_string();
            Some((id.clone(), JobErrorSummary { error, count }))
        })
        .collect()
}

/// Writes the summary to `{dir}/{crawler_id}-crawler-errors.json`
pub struct JsonErrorReport {
    dir: PathBuf,
}

impl JsonErrorReport {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Path of the summary file for `crawler_id`
    pub fn path_for(&self, crawler_id: &str) -> PathBuf {
        self.dir.join(format!("{}-crawler-errors.json", crawler_id))
    }
}

impl ErrorReporter for JsonErrorReport {
    fn report(&mut self, crawler_id: &str, errors: &JobErrors) -> OutputResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(errors)?;
        write_atomic(&self.path_for(crawler_id), json.as_bytes())?;
        Ok(())
    }
}
