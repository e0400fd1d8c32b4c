//! Shell command job
//!
//! Runs a command through `sh -c` whenever its last successful run is older
//! than `max_age` or was produced by a different crawler version. The marker
//! of the last successful run is kept in a small JSON file so freshness
//! survives restarts.

use crate::config::JobEntry;
use crate::job::{freshness, Job, JobError, JobResult, LastProcessed, ShouldProcess};
use crate::storage::write_atomic;
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// A job that shells out to a configured command
pub struct CommandJob {
    id: String,
    priority: i32,
    command: String,
    after: Option<String>,
    max_age: chrono::Duration,
    version: u32,
    last: Option<LastProcessed>,
    marker_path: Option<PathBuf>,
}

impl CommandJob {
    /// Creates a job without marker persistence
    ///
    /// # Arguments
    ///
    /// * `id` - Job id, unique within the crawler
    /// * `command` - Command line passed to `sh -c`
    /// * `max_age` - How long a successful run stays fresh
    /// * `version` - Current crawler version; a marker from another version
    ///   makes the job run again
    pub fn new(
        id: impl Into<String>,
        command: impl Into<String>,
        max_age: chrono::Duration,
        version: u32,
    ) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            command: command.into(),
            after: None,
            max_age,
            version,
            last: None,
            marker_path: None,
        }
    }

    /// Creates a job from a `[[job]]` configuration entry
    ///
    /// The marker is read from and written to
    /// `{marker_dir}/{job-id}.json`. An unreadable marker is logged and
    /// treated as missing.
    pub fn from_config(entry: &JobEntry, version: u32, marker_dir: &Path) -> Self {
        let max_age = i64::try_from(entry.max_age)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);

        let mut job = Self::new(&entry.id, &entry.command, max_age, version)
            .with_priority(entry.priority)
            .with_marker_dir(marker_dir);
        if let Some(after) = &entry.after {
            job = job.with_after(after);
        }
        job
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the command run after each successful run
    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Persists the last-run marker under `dir`, loading any existing one
    pub fn with_marker_dir(mut self, dir: &Path) -> Self {
        let path = dir.join(format!("{}.json", self.id));
        match read_marker(&path) {
            Ok(last) => self.last = last,
            Err(e) => {
                tracing::warn!(job = %self.id, path = %path.display(), error = %e, "ignoring unreadable marker");
            }
        }
        self.marker_path = Some(path);
        self
    }

    /// Marker of the last successful run, if any
    pub fn last(&self) -> Option<&LastProcessed> {
        self.last.as_ref()
    }

    fn save_marker(&self, path: &Path, last: &LastProcessed) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(last)?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl Job for CommandJob {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn should_process(&self) -> ShouldProcess {
        freshness::check(self.last.as_ref(), self.version, self.max_age, Utc::now())
    }

    async fn process(&mut self, cancel: CancellationToken) -> JobResult<LastProcessed> {
        run_shell(&self.command, &cancel).await?;
        Ok(LastProcessed::now(self.version))
    }

    fn set_last(&mut self, last: LastProcessed) {
        if let Some(path) = &self.marker_path {
            if let Err(e) = self.save_marker(path, &last) {
                tracing::warn!(job = %self.id, error = %e, "failed to persist marker");
            }
        }
        self.last = Some(last);
    }

    async fn after(&mut self) -> JobResult<()> {
        match &self.after {
            Some(after) => run_shell(after, &CancellationToken::new()).await,
            None => Ok(()),
        }
    }
}

fn read_marker(path: &Path) -> anyhow::Result<Option<LastProcessed>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_str(&content)?))
}

/// Runs `command` with `sh -c`, killing it when `cancel` fires
async fn run_shell(command: &str, cancel: &CancellationToken) -> JobResult<()> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| JobError::failed(format!("failed to start command: {}", e)))?;

    let output = tokio::select! {
        _ = cancel.cancelled() => return Err(JobError::Cancelled),
        output = child.wait_with_output() => output
            .map_err(|e| JobError::failed(format!("failed to wait for command: {}", e)))?,
    };

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    match stderr.lines().rev().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => Err(JobError::failed(format!(
            "command exited with {}: {}",
            output.status, line
        ))),
        None => Err(JobError::failed(format!(
            "command exited with {}",
            output.status
        ))),
    }
}
