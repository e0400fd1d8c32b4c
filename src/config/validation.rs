use crate::config::types::{Config, CrawlerConfig, JobEntry, StorageConfig};
use crate::job::MAX_ABS_PRIORITY;
use crate::ConfigError;
use std::collections::HashSet;

/// Largest `max-age` in seconds; freshness is tracked at millisecond precision
pub const MAX_JOB_AGE: u64 = i64::MAX as u64 / 1_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_jobs(&config.jobs)?;
    validate_focus(&config.crawler.focus, &config.jobs)?;
    Ok(())
}

/// Validates scheduler loop configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_identifier("crawler id", &config.id)?;

    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.idle_sleep == 0 {
        return Err(ConfigError::Validation(
            "idle-sleep must be > 0 seconds".to_string(),
        ));
    }

    if config.retry_timeout == 0 {
        return Err(ConfigError::Validation(
            "retry-timeout must be > 0 seconds".to_string(),
        ));
    }

    if config.max_retry_timeout < config.retry_timeout {
        return Err(ConfigError::Validation(format!(
            "max-retry-timeout ({}s) must be >= retry-timeout ({}s)",
            config.max_retry_timeout, config.retry_timeout
        )));
    }

    if config.job_timeout == Some(0) {
        return Err(ConfigError::Validation(
            "job-timeout must be > 0 seconds when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates job entries
fn validate_jobs(jobs: &[JobEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for job in jobs {
        validate_identifier("job id", &job.id)?;

        if !seen.insert(job.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "job id '{}' is used more than once",
                job.id
            )));
        }

        if job.priority.unsigned_abs() > MAX_ABS_PRIORITY.unsigned_abs() {
            return Err(ConfigError::Validation(format!(
                "priority of job '{}' must be between -{} and {}, got {}",
                job.id, MAX_ABS_PRIORITY, MAX_ABS_PRIORITY, job.priority
            )));
        }

        if job.command.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "job '{}' has an empty command",
                job.id
            )));
        }

        if job.after.as_deref().is_some_and(|after| after.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "job '{}' has an empty after command",
                job.id
            )));
        }

        if job.max_age == 0 || job.max_age > MAX_JOB_AGE {
            return Err(ConfigError::Validation(format!(
                "max-age of job '{}' must be between 1 and {} seconds, got {}",
                job.id, MAX_JOB_AGE, job.max_age
            )));
        }
    }

    Ok(())
}

/// Validates that every focused id names a configured job
fn validate_focus(focus: &[String], jobs: &[JobEntry]) -> Result<(), ConfigError> {
    for id in focus {
        if !jobs.iter().any(|job| &job.id == id) {
            return Err(ConfigError::Validation(format!(
                "focus references unknown job '{}'",
                id
            )));
        }
    }

    Ok(())
}

/// Validates an identifier: non-empty, alphanumeric plus '-' and '_'
fn validate_identifier(what: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", what)));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "{} must contain only alphanumeric characters, '-' and '_', got '{}'",
            what, value
        )));
    }

    Ok(())
}
