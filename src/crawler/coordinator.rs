//! Crawler coordinator - main scheduling loop
//!
//! This module contains the loop that coordinates job execution:
//! - Loading persisted job states and reconciling them with the registry
//! - Building and ranking the candidate queue every iteration
//! - Executing a capped batch, one job at a time
//! - Recording outcomes and scheduling retries for failures
//! - Persisting state after each batch and idling when nothing is due

use crate::config::CrawlerConfig;
use crate::crawler::backoff::{retry_delay, DEFAULT_MAX_RETRY_TIMEOUT, DEFAULT_RETRY_TIMEOUT};
use crate::crawler::queue::{take_batch, Candidate, PRIORITY_WEIGHT};
use crate::job::{Job, JobError, JobResult, LastProcessed, ShouldProcess, MAX_ABS_PRIORITY};
use crate::output::{collect_errors, ErrorReporter, JobErrors};
use crate::state::{HistoryItem, JobState, JobStates};
use crate::storage::SnapshotStore;
use crate::SchedulerError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Default number of jobs processed per iteration
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default sleep when an iteration finds nothing to run
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_secs(5 * 60);

/// Tunables of a crawler instance
#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    /// Crawler identity, also the snapshot key
    pub id: String,

    /// Version stamped on every history item
    pub version: u32,

    /// Job ids run unconditionally; empty means normal scheduling
    pub focus: Vec<String>,

    pub retry_timeout: Duration,
    pub max_retry_timeout: Duration,
    pub batch_size: usize,
    pub idle_sleep: Duration,

    /// Limit for a single `process()` call
    pub job_timeout: Option<Duration>,
}

impl CrawlerSettings {
    /// Settings with the default retry, batch and idle values
    pub fn new(id: impl Into<String>, version: u32) -> Self {
        Self {
            id: id.into(),
            version,
            focus: Vec::new(),
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            max_retry_timeout: DEFAULT_MAX_RETRY_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            job_timeout: None,
        }
    }

    /// Settings taken from the `[crawler]` configuration section
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            id: config.id.clone(),
            version: config.version,
            focus: config.focus.clone(),
            retry_timeout: Duration::from_secs(config.retry_timeout),
            max_retry_timeout: Duration::from_secs(config.max_retry_timeout),
            batch_size: config.batch_size,
            idle_sleep: Duration::from_secs(config.idle_sleep),
            job_timeout: config.job_timeout.map(Duration::from_secs),
        }
    }
}

/// Main crawler structure
///
/// Owns the job registry, the per-job states and the persistence sinks. Only
/// one job runs at a time; all state mutation happens on the task driving
/// [`Crawler::run`].
pub struct Crawler {
    settings: CrawlerSettings,
    jobs: Vec<Box<dyn Job>>,
    states: JobStates,
    focus: HashSet<String>,
    store: Box<dyn SnapshotStore>,
    reporter: Box<dyn ErrorReporter>,
    loaded: bool,
}

impl Crawler {
    /// Creates a new crawler instance
    ///
    /// # Arguments
    ///
    /// * `settings` - Identity and tunables
    /// * `jobs` - The job registry; ids must be unique
    /// * `store` - Where the snapshot is read from and written to
    /// * `reporter` - Sink for the error summary
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Registry is valid
    /// * `Err(SchedulerError)` - Duplicate ids, out-of-range priority, or a
    ///   focus id that names no registered job
    pub fn new(
        settings: CrawlerSettings,
        jobs: Vec<Box<dyn Job>>,
        store: Box<dyn SnapshotStore>,
        reporter: Box<dyn ErrorReporter>,
    ) -> Result<Self, SchedulerError> {
        let mut ids = HashSet::new();
        for job in &jobs {
            if !ids.insert(job.id().to_string()) {
                return Err(SchedulerError::DuplicateJob(job.id().to_string()));
            }

            let priority = job.priority();
            if priority.unsigned_abs() > MAX_ABS_PRIORITY.unsigned_abs() {
                return Err(SchedulerError::PriorityOutOfRange {
                    id: job.id().to_string(),
                    priority,
                });
            }
        }

        let focus: HashSet<String> = settings.focus.iter().cloned().collect();
        if let Some(unknown) = focus.iter().find(|id| !ids.contains(*id)) {
            return Err(SchedulerError::UnknownFocusJob(unknown.clone()));
        }

        Ok(Self {
            settings,
            jobs,
            states: JobStates::new(),
            focus,
            store,
            reporter,
            loaded: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.settings.id
    }

    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    /// All job states, keyed by job id
    pub fn states(&self) -> &JobStates {
        &self.states
    }

    /// State of a single job
    pub fn state(&self, id: &str) -> Option<&JobState> {
        self.states.get(id)
    }

    /// Loads persisted job states
    ///
    /// States of jobs that are no longer registered are dropped, registered
    /// jobs without a state get an empty one, and every pending retry is
    /// forgiven so each job is reconsidered right away.
    ///
    /// A missing snapshot means a first run. Any other read error is returned.
    pub fn load(&mut self) -> Result<(), SchedulerError> {
        let stored = self.store.read(&self.settings.id)?.unwrap_or_default();
        let stored_count = stored.len();

        let registered: HashSet<&str> = self.jobs.iter().map(|job| job.id()).collect();
        let mut states: JobStates = stored
            .into_iter()
            .filter(|(id, _)| registered.contains(id.as_str()))
            .collect();
        let pruned = stored_count - states.len();

        for state in states.values_mut() {
            state.restore();
        }

        for job in &self.jobs {
            states.entry(job.id().to_string()).or_default();
        }

        tracing::info!(
            crawler = %self.settings.id,
            jobs = states.len(),
            pruned,
            "loaded job states"
        );

        self.states = states;
        self.loaded = true;
        Ok(())
    }

    /// Persists the snapshot and publishes the error summary
    ///
    /// A failing error sink is logged and otherwise ignored; only a failed
    /// snapshot write is returned.
    pub fn save(&mut self) -> Result<(), SchedulerError> {
        self.store.write(&self.settings.id, &self.states)?;

        let errors = self.error_summary();
        if let Err(e) = self.reporter.report(&self.settings.id, &errors) {
            tracing::warn!(error = %e, "failed to write error summary");
        }

        tracing::debug!("state saved");
        Ok(())
    }

    /// Latest error of every job failing more than twice in a row
    pub fn error_summary(&self) -> JobErrors {
        collect_errors(&self.states)
    }

    /// Builds the list of jobs that may run at `now`
    ///
    /// With a focus set, exactly the focused jobs are returned without
    /// consulting backoff or `should_process`. Otherwise jobs inside their
    /// retry window are skipped and the rest are asked whether they need to
    /// run.
    pub fn build_queue(&self, now: DateTime<Utc>) -> Vec<Candidate> {
        let mut queue = Vec::new();

        for (index, job) in self.jobs.iter().enumerate() {
            let id = job.id();
            let state = self.states.get(id);
            let total_duration = state.map_or(0.0, JobState::total_duration);

            if !self.focus.is_empty() {
                if self.focus.contains(id) {
                    queue.push(Candidate::new(index, id, job.priority(), total_duration, "focus"));
                }
                continue;
            }

            if state.is_some_and(|s| s.is_waiting(now)) {
                tracing::trace!(job = %id, "waiting for retry");
                continue;
            }

            if let ShouldProcess::Run { reason } = job.should_process() {
                if total_duration > PRIORITY_WEIGHT {
                    tracing::debug!(
                        job = %id,
                        total_duration,
                        "recent duration exceeds one priority step"
                    );
                }
                queue.push(Candidate::new(index, id, job.priority(), total_duration, reason));
            }
        }

        queue
    }

    /// Runs a single iteration: queue, rank, execute, persist
    ///
    /// Stops starting new jobs once `shutdown` fires. State is persisted when
    /// at least one job ran; a failed write is logged and retried with the
    /// next batch.
    ///
    /// # Returns
    ///
    /// The number of jobs whose outcome was recorded
    pub async fn run_batch(&mut self, shutdown: &CancellationToken) -> usize {
        let queue = self.build_queue(Utc::now());
        tracing::info!(count = queue.len(), "queue built");

        let batch = take_batch(queue, self.settings.batch_size);

        let mut processed = 0;
        for candidate in batch {
            if shutdown.is_cancelled() {
                tracing::info!("shutdown requested, not starting new jobs");
                break;
            }

            if self
                .process_job(candidate.index, &candidate.reason, shutdown)
                .await
            {
                processed += 1;
            }
        }

        if processed > 0 {
            if let Err(e) = self.save() {
                tracing::error!(error = %e, "failed to save state");
            }
        }

        processed
    }

    /// Runs the scheduling loop until `shutdown` fires
    ///
    /// Loads state first if [`Crawler::load`] has not been called.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SchedulerError> {
        if !self.loaded {
            self.load()?;
        }

        let span = tracing::info_span!("crawler", id = %self.settings.id);
        async {
            tracing::info!(version = self.settings.version, "started");

            while !shutdown.is_cancelled() {
                let processed = self.run_batch(&shutdown).await;
                if processed > 0 {
                    continue;
                }

                tracing::info!("all processed, waiting");
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.settings.idle_sleep) => {}
                }
            }

            tracing::info!("stopped");
        }
        .instrument(span)
        .await;

        Ok(())
    }

    /// Processes a single job and records the outcome
    ///
    /// Never fails: every error ends up in the job's history and sets its
    /// retry deadline. An attempt cut short by `shutdown` leaves the history
    /// untouched and returns `false`.
    async fn process_job(
        &mut self,
        index: usize,
        reason: &str,
        shutdown: &CancellationToken,
    ) -> bool {
        let version = self.settings.version;
        let job = &mut self.jobs[index];
        let id = job.id().to_string();

        tracing::info!(job = %id, reason, "processing job");

        let started = Instant::now();
        let result = match execute(job.as_mut(), self.settings.job_timeout, shutdown).await {
            Ok(last) => {
                job.set_last(last);
                if let Err(e) = job.after().await {
                    tracing::warn!(job = %id, error = %e, "after hook failed");
                }
                Ok(())
            }
            Err(e) => Err(e),
        };
        let duration = started.elapsed().as_secs_f64();

        if let Err(e) = &result {
            if shutdown.is_cancelled() && !matches!(e, JobError::TimedOut(_)) {
                tracing::info!(
                    job = %id,
                    duration,
                    error = %e,
                    "job interrupted by shutdown, not recorded"
                );
                return false;
            }
        }

        let state = self.states.entry(id.clone()).or_default();
        match result {
            Ok(()) => {
                state.record(HistoryItem::success(duration, version));
                state.retry_at = None;
                tracing::info!(job = %id, duration, "processed job");
            }
            Err(e) => {
                let message = e.to_string();
                state.record(HistoryItem::error(duration, version, message.as_str()));

                let retry_count = state.consecutive_failures();
                let delay = retry_delay(
                    retry_count,
                    self.settings.retry_timeout,
                    self.settings.max_retry_timeout,
                );
                let retry_at = retry_deadline(Utc::now(), delay);
                state.retry_at = Some(retry_at);

                if retry_count > 1 {
                    tracing::warn!(
                        job = %id,
                        duration,
                        retry_count,
                        %retry_at,
                        message = %message,
                        "job failed"
                    );
                } else {
                    tracing::info!(
                        job = %id,
                        duration,
                        retry_count,
                        %retry_at,
                        message = %message,
                        "job failed, will be retried"
                    );
                }
            }
        }

        true
    }
}

/// Runs `process()` under the optional time limit
async fn execute(
    job: &mut dyn Job,
    timeout: Option<Duration>,
    shutdown: &CancellationToken,
) -> JobResult<LastProcessed> {
    let cancel = shutdown.child_token();
    let process = job.process(cancel.clone());

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, process).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(JobError::TimedOut(limit))
            }
        },
        None => process.await,
    }
}

/// `now + delay`, clamped to the latest representable time
fn retry_deadline(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputResult;
    use crate::storage::StorageResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Job whose outcomes are scripted per attempt
    struct ScriptedJob {
        id: String,
        priority: i32,
        decision: ShouldProcess,
        outcomes: VecDeque<Result<(), String>>,
        after_fails: bool,
        calls: Arc<Mutex<Vec<String>>>,
        last: Option<LastProcessed>,
    }

    impl ScriptedJob {
        fn new(id: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                id: id.to_string(),
                priority: 0,
                decision: ShouldProcess::run("due"),
                outcomes: VecDeque::new(),
                after_fails: false,
                calls: calls.clone(),
                last: None,
            }
        }

        fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }

        fn with_decision(mut self, decision: ShouldProcess) -> Self {
            self.decision = decision;
            self
        }

        fn with_outcomes(mut self, outcomes: &[Result<(), &str>]) -> Self {
            self.outcomes = outcomes
                .iter()
                .map(|o| o.map_err(|e| e.to_string()))
                .collect();
            self
        }
    }

    #[async_trait]
    impl Job for ScriptedJob {
        fn id(&self) -> &str {
            &self.id
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn should_process(&self) -> ShouldProcess {
            self.calls
                .lock()
                .unwrap()
                .push(format!("should_process:{}", self.id));
            self.decision.clone()
        }

        async fn process(&mut self, _cancel: CancellationToken) -> JobResult<LastProcessed> {
            self.calls.lock().unwrap().push(format!("process:{}", self.id));
            match self.outcomes.pop_front().unwrap_or(Ok(())) {
                Ok(()) => Ok(LastProcessed::now(1)),
                Err(message) => Err(JobError::failed(message)),
            }
        }

        fn set_last(&mut self, last: LastProcessed) {
            self.last = Some(last);
        }

        async fn after(&mut self) -> JobResult<()> {
            self.calls.lock().unwrap().push(format!("after:{}", self.id));
            if self.after_fails {
                Err(JobError::failed("after exploded"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default, Clone)]
    struct MemoryStore {
        snapshot: Arc<Mutex<Option<JobStates>>>,
        fail_writes: bool,
    }

    impl SnapshotStore for MemoryStore {
        fn read(&self, _key: &str) -> StorageResult<Option<JobStates>> {
            Ok(self.snapshot.lock().unwrap().clone())
        }

        fn write(&mut self, _key: &str, states: &JobStates) -> StorageResult<()> {
            if self.fail_writes {
                return Err(std::io::Error::other("disk full").into());
            }
            *self.snapshot.lock().unwrap() = Some(states.clone());
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingReporter {
        reports: Arc<Mutex<Vec<JobErrors>>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&mut self, _crawler_id: &str, errors: &JobErrors) -> OutputResult<()> {
            self.reports.lock().unwrap().push(errors.clone());
            Ok(())
        }
    }

    fn crawler_with(
        settings: CrawlerSettings,
        jobs: Vec<ScriptedJob>,
        store: MemoryStore,
    ) -> (Crawler, RecordingReporter) {
        let reporter = RecordingReporter::default();
        let jobs = jobs
            .into_iter()
            .map(|job| Box::new(job) as Box<dyn Job>)
            .collect();
        let crawler = Crawler::new(settings, jobs, Box::new(store), Box::new(reporter.clone()))
            .unwrap();
        (crawler, reporter)
    }

    fn calls() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn queue_ids(crawler: &Crawler) -> Vec<String> {
        let batch = take_batch(crawler.build_queue(Utc::now()), usize::MAX);
        batch.into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let log = calls();
        let jobs: Vec<Box<dyn Job>> = vec![
            Box::new(ScriptedJob::new("a", &log)),
            Box::new(ScriptedJob::new("a", &log)),
        ];
        let result = Crawler::new(
            CrawlerSettings::new("test", 1),
            jobs,
            Box::new(MemoryStore::default()),
            Box::new(RecordingReporter::default()),
        );
        assert!(matches!(result, Err(SchedulerError::DuplicateJob(id)) if id == "a"));
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        let log = calls();
        let jobs: Vec<Box<dyn Job>> = vec![Box::new(ScriptedJob::new("a", &log).with_priority(1001))];
        let result = Crawler::new(
            CrawlerSettings::new("test", 1),
            jobs,
            Box::new(MemoryStore::default()),
            Box::new(RecordingReporter::default()),
        );
        assert!(matches!(
            result,
            Err(SchedulerError::PriorityOutOfRange { priority: 1001, .. })
        ));
    }

    #[test]
    fn test_unknown_focus_rejected() {
        let log = calls();
        let mut settings = CrawlerSettings::new("test", 1);
        settings.focus = vec!["ghost".to_string()];
        let jobs: Vec<Box<dyn Job>> = vec![Box::new(ScriptedJob::new("a", &log))];
        let result = Crawler::new(
            settings,
            jobs,
            Box::new(MemoryStore::default()),
            Box::new(RecordingReporter::default()),
        );
        assert!(matches!(result, Err(SchedulerError::UnknownFocusJob(id)) if id == "ghost"));
    }

    #[test]
    fn test_load_prunes_and_forgives() {
        let mut waiting = JobState::new();
        waiting.record(HistoryItem::error(1.0, 1, "boom"));
        waiting.retry_at = Some(Utc::now() + chrono::Duration::hours(1));

        let mut stored = JobStates::new();
        stored.insert("kept".to_string(), waiting);
        stored.insert("removed".to_string(), JobState::new());

        let store = MemoryStore::default();
        *store.snapshot.lock().unwrap() = Some(stored);

        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("kept", &log), ScriptedJob::new("added", &log)],
            store,
        );
        crawler.load().unwrap();

        let ids: Vec<&String> = crawler.states().keys().collect();
        assert_eq!(ids, vec!["added", "kept"]);
        assert!(crawler.states().values().all(|s| s.retry_at.is_none()));
        assert_eq!(crawler.state("kept").unwrap().history().len(), 1);
        assert!(crawler.state("added").unwrap().history().is_empty());
    }

    #[test]
    fn test_retry_window_skips_should_process() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("waiting", &log), ScriptedJob::new("ready", &log)],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        crawler.states.get_mut("waiting").unwrap().retry_at =
            Some(Utc::now() + chrono::Duration::minutes(5));

        assert_eq!(queue_ids(&crawler), vec!["ready"]);
        assert_eq!(*log.lock().unwrap(), vec!["should_process:ready"]);
    }

    #[test]
    fn test_expired_retry_window_is_reconsidered() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log)],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        crawler.states.get_mut("job").unwrap().retry_at =
            Some(Utc::now() - chrono::Duration::seconds(1));

        assert_eq!(queue_ids(&crawler), vec!["job"]);
    }

    #[test]
    fn test_skip_decision_excluded() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![
                ScriptedJob::new("idle", &log).with_decision(ShouldProcess::Skip),
                ScriptedJob::new("busy", &log),
            ],
            MemoryStore::default(),
        );
        crawler.load().unwrap();

        assert_eq!(queue_ids(&crawler), vec!["busy"]);
    }

    #[test]
    fn test_focus_overrides_everything() {
        let log = calls();
        let mut settings = CrawlerSettings::new("test", 1);
        settings.focus = vec!["pinned".to_string()];

        let (mut crawler, _) = crawler_with(
            settings,
            vec![
                ScriptedJob::new("pinned", &log).with_decision(ShouldProcess::Skip),
                ScriptedJob::new("other", &log),
            ],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        crawler.states.get_mut("pinned").unwrap().retry_at =
            Some(Utc::now() + chrono::Duration::hours(1));

        let queue = crawler.build_queue(Utc::now());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "pinned");
        assert_eq!(queue[0].reason, "focus");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_queue_ranked_by_priority_then_duration() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![
                ScriptedJob::new("b", &log),
                ScriptedJob::new("a", &log).with_priority(10),
                ScriptedJob::new("c", &log),
            ],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        crawler
            .states
            .get_mut("a")
            .unwrap()
            .record(HistoryItem::success(100.0, 1));
        crawler
            .states
            .get_mut("b")
            .unwrap()
            .record(HistoryItem::success(30.0, 1));

        assert_eq!(queue_ids(&crawler), vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_success_records_history_and_clears_retry() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 7),
            vec![ScriptedJob::new("job", &log)],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        crawler.states.get_mut("job").unwrap().retry_at = Some(Utc::now());

        let shutdown = CancellationToken::new();
        crawler.process_job(0, "due", &shutdown).await;

        let state = crawler.state("job").unwrap();
        assert_eq!(state.history().len(), 1);
        assert!(!state.history()[0].is_error());
        assert_eq!(state.history()[0].crawler_version(), 7);
        assert!(state.retry_at.is_none());
        assert_eq!(state.total_duration(), state.history()[0].duration());
        assert_eq!(*log.lock().unwrap(), vec!["process:job", "after:job"]);
    }

    #[tokio::test]
    async fn test_after_failure_keeps_success() {
        let log = calls();
        let mut job = ScriptedJob::new("job", &log);
        job.after_fails = true;
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![job],
            MemoryStore::default(),
        );
        crawler.load().unwrap();

        crawler.process_job(0, "due", &CancellationToken::new()).await;

        let state = crawler.state("job").unwrap();
        assert!(!state.history()[0].is_error());
        assert!(state.retry_at.is_none());
    }

    #[tokio::test]
    async fn test_failures_back_off_exponentially() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log).with_outcomes(&[Err("one"), Err("two"), Err("three")])],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        let shutdown = CancellationToken::new();

        for (attempt, minutes) in [(1, 5), (2, 10), (3, 20)] {
            let before = Utc::now();
            crawler.process_job(0, "due", &shutdown).await;
            let after = Utc::now();

            let state = crawler.state("job").unwrap();
            assert_eq!(state.consecutive_failures(), attempt);

            let retry_at = state.retry_at.unwrap();
            let delay = chrono::Duration::minutes(minutes);
            assert!(retry_at >= before + delay && retry_at <= after + delay);
        }

        let state = crawler.state("job").unwrap();
        assert_eq!(state.last_error(), Some("three"));
        // after() only runs on success
        assert!(!log.lock().unwrap().iter().any(|c| c.starts_with("after")));
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log).with_outcomes(&[Err("a"), Err("b"), Err("c"), Ok(())])],
            MemoryStore::default(),
        );
        crawler.load().unwrap();
        let shutdown = CancellationToken::new();

        for _ in 0..4 {
            crawler.process_job(0, "due", &shutdown).await;
        }

        let state = crawler.state("job").unwrap();
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.history().iter().filter(|i| i.is_error()).count(), 3);
        assert!(state.retry_at.is_none());
    }

    #[tokio::test]
    async fn test_run_batch_caps_and_persists() {
        let log = calls();
        let store = MemoryStore::default();
        let mut settings = CrawlerSettings::new("test", 1);
        settings.batch_size = 2;

        let jobs = (0..4)
            .map(|i| ScriptedJob::new(&format!("job-{i}"), &log))
            .collect();
        let (mut crawler, reporter) = crawler_with(settings, jobs, store.clone());
        crawler.load().unwrap();

        let processed = crawler.run_batch(&CancellationToken::new()).await;

        assert_eq!(processed, 2);
        let saved = store.snapshot.lock().unwrap().clone().unwrap();
        assert_eq!(saved.len(), 4);
        assert_eq!(reporter.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_persist() {
        let log = calls();
        let store = MemoryStore::default();
        let (mut crawler, reporter) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("idle", &log).with_decision(ShouldProcess::Skip)],
            store.clone(),
        );
        crawler.load().unwrap();

        let processed = crawler.run_batch(&CancellationToken::new()).await;

        assert_eq!(processed, 0);
        assert!(store.snapshot.lock().unwrap().is_none());
        assert!(reporter.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_batch() {
        let log = calls();
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log)],
            store,
        );
        crawler.load().unwrap();

        let processed = crawler.run_batch(&CancellationToken::new()).await;

        assert_eq!(processed, 1);
        assert_eq!(crawler.state("job").unwrap().history().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_shutdown_starts_nothing() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log)],
            MemoryStore::default(),
        );
        crawler.load().unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let processed = crawler.run_batch(&shutdown).await;

        assert_eq!(processed, 0);
        assert!(!log.lock().unwrap().iter().any(|c| c.starts_with("process")));
    }

    #[tokio::test]
    async fn test_attempt_interrupted_by_shutdown_not_recorded() {
        let log = calls();
        let (mut crawler, _) = crawler_with(
            CrawlerSettings::new("test", 1),
            vec![ScriptedJob::new("job", &log).with_outcomes(&[Err("cancelled")])],
            MemoryStore::default(),
        );
        crawler.load().unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let recorded = crawler.process_job(0, "due", &shutdown).await;

        assert!(!recorded);
        let state = crawler.state("job").unwrap();
        assert!(state.history().is_empty());
        assert!(state.retry_at.is_none());
        assert_eq!(*log.lock().unwrap(), vec!["process:job"]);
    }

    #[test]
    fn test_retry_deadline_clamps() {
        let now = Utc::now();
        assert_eq!(
            retry_deadline(now, Duration::from_secs(60)),
            now + chrono::Duration::seconds(60)
        );
        assert_eq!(retry_deadline(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_settings_from_config() {
        let config = CrawlerConfig {
            id: "feeds".to_string(),
            version: 2,
            batch_size: 3,
            idle_sleep: 60,
            retry_timeout: 30,
            max_retry_timeout: 600,
            job_timeout: Some(10),
            focus: vec!["a".to_string()],
        };

        let settings = CrawlerSettings::from_config(&config);
        assert_eq!(settings.batch_size, 3);
        assert_eq!(settings.idle_sleep, Duration::from_secs(60));
        assert_eq!(settings.retry_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_retry_timeout, Duration::from_secs(600));
        assert_eq!(settings.job_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.focus, vec!["a".to_string()]);
    }
}
