//! Output module for operational visibility
//!
//! This module provides:
//! - The `ErrorReporter` sink receiving the error summary after every batch
//! - A JSON file implementation of that sink
//! - Statistics generated from a persisted snapshot

mod errors;
mod stats;
mod traits;

pub use errors::{collect_errors, JsonErrorReport, REPORT_THRESHOLD};
pub use stats::{load_statistics, print_statistics, CrawlerStatistics, JobStatistics};
pub use traits::{ErrorReporter, JobErrorSummary, JobErrors, OutputError, OutputResult};
