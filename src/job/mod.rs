//! Job contract
//!
//! The crawler knows nothing about what a job does. It only relies on:
//!
//! - `Job`: identity, priority, the `should_process` decision, `process` and
//!   the optional `after` hook
//! - `ShouldProcess`: the run/skip decision with an advisory reason
//! - `LastProcessed`: the marker a successful run produces
//! - `freshness`: a helper for interval-based `should_process` implementations

pub mod freshness;
mod traits;

pub use traits::{
    Job, JobError, JobResult, LastProcessed, ShouldProcess, MAX_ABS_PRIORITY,
};
