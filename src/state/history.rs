/// History item definitions for tracking job attempts
///
/// Every `process()` attempt leaves one item behind, either a success or an
/// error carrying the failure message.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single job attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryItem {
    Success {
        /// Wall-clock seconds spent in the attempt
        duration: f64,
        crawler_version: u32,
        timestamp: DateTime<Utc>,
    },
    Error {
        /// Wall-clock seconds spent before the failure surfaced
        duration: f64,
        crawler_version: u32,
        timestamp: DateTime<Utc>,
        message: String,
    },
}

impl HistoryItem {
    /// Creates a success item stamped with the current time
    pub fn success(duration: f64, crawler_version: u32) -> Self {
        Self::Success {
            duration,
            crawler_version,
            timestamp: Utc::now(),
        }
    }

    /// Creates an error item stamped with the current time
    pub fn error(duration: f64, crawler_version: u32, message: impl Into<String>) -> Self {
        Self::Error {
            duration,
            crawler_version,
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Success { duration, .. } | Self::Error { duration, .. } => *duration,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Success { timestamp, .. } | Self::Error { timestamp, .. } => *timestamp,
        }
    }

    pub fn crawler_version(&self) -> u32 {
        match self {
            Self::Success {
                crawler_version, ..
            }
            | Self::Error {
                crawler_version, ..
            } => *crawler_version,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the failure message for error items
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            Self::Success { .. } => None,
        }
    }
}
