//! Configuration module for Sumi-Scheduler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_scheduler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scheduler.toml")).unwrap();
//! println!("Crawler '{}' runs {} jobs", config.crawler.id, config.jobs.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, JobEntry, StorageBackend, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
