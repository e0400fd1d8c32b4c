//! Freshness checks for jobs that re-run on a fixed interval

use crate::job::{LastProcessed, ShouldProcess};
use chrono::{DateTime, Duration, Utc};

/// Decides whether a job whose results go stale after `max_age` should run
///
/// A job runs when it has never produced a result, when its last result was
/// produced by a different `version` of the job, or when the last result is
/// older than `max_age`.
pub fn check(
    last: Option<&LastProcessed>,
    version: u32,
    max_age: Duration,
    now: DateTime<Utc>,
) -> ShouldProcess {
    let Some(last) = last else {
        return ShouldProcess::run("never processed");
    };

    if last.version != version {
        return ShouldProcess::run("outdated version");
    }

    let age = now - last.timestamp;
    if age < max_age {
        return ShouldProcess::Skip;
    }

    let by = age - max_age;
    ShouldProcess::run(format!("expired by {} min", by.num_minutes()))
}
