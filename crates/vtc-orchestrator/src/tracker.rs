//! Job state tracker.
//!
//! Polls the worker for each watched job until it reaches a terminal state.
//! Every job owns one spawned task, so a slow or failing job never delays
//! another job's callbacks. Only one poll per job is ever in flight: the
//! next poll is scheduled after the previous one resolves.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, Instrument};

use vtc_client::{ClientResult, TranscodeClient};
use vtc_models::{JobId, JobProgress, JobState, TranscodeJob};

use crate::config::PollConfig;
use crate::error::{JobFailure, OrchestratorError, OrchestratorResult};
use crate::logging::{FailureTracker, JobLogger};
use crate::metrics;
use crate::timer::{Timer, TokioTimer};

/// Consecutive poll failures logged per job before suppression.
const MAX_LOGGED_POLL_FAILURES: u32 = 3;

/// Source of job snapshots.
#[async_trait]
pub trait JobStatusSource: Send + Sync + 'static {
    async fn job_status(&self, job_id: &JobId) -> ClientResult<TranscodeJob>;
}

#[async_trait]
impl JobStatusSource for TranscodeClient {
    async fn job_status(&self, job_id: &JobId) -> ClientResult<TranscodeJob> {
        self.get_status(job_id).await
    }
}

/// Receives job lifecycle callbacks.
///
/// Exactly one of `on_complete` / `on_error` fires per watched job.
pub trait JobObserver: Send + Sync + 'static {
    /// Non-terminal snapshot.
    fn on_progress(&self, _job: &TranscodeJob) {}

    fn on_complete(&self, job: TranscodeJob);

    fn on_error(&self, failure: JobFailure);
}

/// Lifecycle event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum JobEvent {
    Progress(JobProgress),
    Completed(TranscodeJob),
    Failed(JobFailure),
}

impl JobEvent {
    /// Job the event belongs to.
    pub fn job_id(&self) -> &JobId {
        match self {
            JobEvent::Progress(p) => &p.id,
            JobEvent::Completed(job) => &job.id,
            JobEvent::Failed(failure) => &failure.job_id,
        }
    }

    /// `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress(_))
    }
}

/// Observer that forwards every callback into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl JobObserver for ChannelObserver {
    fn on_progress(&self, job: &TranscodeJob) {
        let _ = self.tx.send(JobEvent::Progress(JobProgress::from(job)));
    }

    fn on_complete(&self, job: TranscodeJob) {
        let _ = self.tx.send(JobEvent::Completed(job));
    }

    fn on_error(&self, failure: JobFailure) {
        let _ = self.tx.send(JobEvent::Failed(failure));
    }
}

struct WatchEntry {
    generation: u64,
    handle: AbortHandle,
}

type WatchMap = Arc<Mutex<HashMap<JobId, WatchEntry>>>;

fn lock_watches(watches: &Mutex<HashMap<JobId, WatchEntry>>) -> MutexGuard<'_, HashMap<JobId, WatchEntry>> {
    watches.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remove the entry only if it still belongs to this task.
fn release(watches: &Mutex<HashMap<JobId, WatchEntry>>, job_id: &JobId, generation: u64) {
    let mut map = lock_watches(watches);
    if map.get(job_id).map(|e| e.generation) == Some(generation) {
        map.remove(job_id);
    }
}

/// Releases the task's watch entry on any exit, including a panic in an
/// observer or an abort.
struct WatchSlot {
    watches: WatchMap,
    job_id: JobId,
    generation: u64,
}

impl WatchSlot {
    fn release(&self) {
        release(&self.watches, &self.job_id, self.generation);
    }
}

impl Drop for WatchSlot {
    fn drop(&mut self) {
        self.release();
    }
}

struct GroupState {
    outstanding: Mutex<HashSet<JobId>>,
    remaining: watch::Sender<usize>,
}

/// Leaves the group when the polling task ends or is aborted.
struct GroupMember {
    job_id: JobId,
    group: Arc<GroupState>,
}

impl Drop for GroupMember {
    fn drop(&mut self) {
        let mut outstanding = self
            .group
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        outstanding.remove(&self.job_id);
        self.group.remaining.send_replace(outstanding.len());
    }
}

/// Handle for a batch registered with [`JobStateTracker::watch_multiple_jobs`].
pub struct JobGroup {
    state: Arc<GroupState>,
    remaining: watch::Receiver<usize>,
}

impl JobGroup {
    /// Ids that have not yet reached a terminal state or been stopped.
    pub fn active(&self) -> Vec<JobId> {
        let outstanding = self
            .state
            .outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<JobId> = outstanding.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether every member finished or was stopped.
    pub fn is_done(&self) -> bool {
        *self.remaining.borrow() == 0
    }

    /// Resolve once every member finished or was stopped.
    pub async fn wait(&self) {
        let mut rx = self.remaining.clone();
        // The sender lives in `self.state`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|remaining| *remaining == 0).await;
    }
}

#[derive(Clone)]
struct PollContext {
    source: Arc<dyn JobStatusSource>,
    timer: Arc<dyn Timer>,
    config: PollConfig,
    watches: WatchMap,
}

/// Tracks remote jobs until they complete or fail.
pub struct JobStateTracker {
    ctx: PollContext,
    next_generation: AtomicU64,
}

impl JobStateTracker {
    /// Tracker that sleeps on the tokio clock.
    pub fn new(source: Arc<dyn JobStatusSource>, config: PollConfig) -> Self {
        Self::with_timer(source, Arc::new(TokioTimer), config)
    }

    /// Tracker with an injected timer.
    pub fn with_timer(
        source: Arc<dyn JobStatusSource>,
        timer: Arc<dyn Timer>,
        config: PollConfig,
    ) -> Self {
        Self {
            ctx: PollContext {
                source,
                timer,
                config,
                watches: Arc::new(Mutex::new(HashMap::new())),
            },
            next_generation: AtomicU64::new(1),
        }
    }

    /// Polling cadence shared by every watched job.
    pub fn poll_config(&self) -> PollConfig {
        self.ctx.config
    }

    /// Start polling a job. The first poll happens immediately.
    pub fn watch_job(&self, job_id: JobId, observer: Arc<dyn JobObserver>) -> OrchestratorResult<()> {
        let mut watches = lock_watches(&self.ctx.watches);
        if watches.contains_key(&job_id) {
            return Err(OrchestratorError::AlreadyWatching(job_id));
        }
        self.spawn_locked(&mut watches, job_id, observer, None);
        Ok(())
    }

    /// Watch a batch of jobs, each on its own independent schedule.
    ///
    /// The whole batch is rejected if any id is already watched.
    pub fn watch_multiple_jobs(
        &self,
        job_ids: Vec<JobId>,
        observer: Arc<dyn JobObserver>,
    ) -> OrchestratorResult<JobGroup> {
        let mut unique = Vec::with_capacity(job_ids.len());
        let mut seen = HashSet::new();
        for id in job_ids {
            if seen.insert(id.clone()) {
                unique.push(id);
            }
        }

        let mut watches = lock_watches(&self.ctx.watches);
        if let Some(taken) = unique.iter().find(|id| watches.contains_key(*id)) {
            return Err(OrchestratorError::AlreadyWatching(taken.clone()));
        }

        let (remaining_tx, remaining_rx) = watch::channel(unique.len());
        let state = Arc::new(GroupState {
            outstanding: Mutex::new(seen),
            remaining: remaining_tx,
        });

        for job_id in unique {
            let member = GroupMember {
                job_id: job_id.clone(),
                group: Arc::clone(&state),
            };
            self.spawn_locked(&mut watches, job_id, Arc::clone(&observer), Some(member));
        }

        Ok(JobGroup {
            state,
            remaining: remaining_rx,
        })
    }

    /// Stop observing a job. The remote job keeps running.
    pub fn stop_watching(&self, job_id: &JobId) -> bool {
        let entry = lock_watches(&self.ctx.watches).remove(job_id);
        match entry {
            Some(entry) => {
                entry.handle.abort();
                debug!(job_id = %job_id, "Stopped watching job");
                true
            }
            None => false,
        }
    }

    /// Stop observing every job. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let drained: Vec<(JobId, WatchEntry)> = lock_watches(&self.ctx.watches).drain().collect();
        for (_, entry) in &drained {
            entry.handle.abort();
        }
        drained.len()
    }

    /// Ids currently being polled, sorted.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = lock_watches(&self.ctx.watches).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether a polling task is registered for the id.
    pub fn is_watching(&self, job_id: &JobId) -> bool {
        lock_watches(&self.ctx.watches).contains_key(job_id)
    }

    /// Spawn the polling task. The map lock must be held so the task cannot
    /// release its entry before it is inserted.
    fn spawn_locked(
        &self,
        watches: &mut HashMap<JobId, WatchEntry>,
        job_id: JobId,
        observer: Arc<dyn JobObserver>,
        member: Option<GroupMember>,
    ) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let logger = JobLogger::new(&job_id, "watch");
        let span = logger.create_span();
        let task = poll_job(
            self.ctx.clone(),
            job_id.clone(),
            generation,
            observer,
            logger,
            member,
        );
        let handle = tokio::spawn(task.instrument(span)).abort_handle();
        watches.insert(job_id, WatchEntry { generation, handle });
    }
}

async fn poll_job(
    ctx: PollContext,
    job_id: JobId,
    generation: u64,
    observer: Arc<dyn JobObserver>,
    logger: JobLogger,
    _member: Option<GroupMember>,
) {
    let slot = WatchSlot {
        watches: ctx.watches.clone(),
        job_id: job_id.clone(),
        generation,
    };
    let mut failures = FailureTracker::new(MAX_LOGGED_POLL_FAILURES);
    let mut last_progress: Option<u8> = None;

    logger.log_start("polling for status");

    loop {
        match ctx.source.job_status(&job_id).await {
            Ok(job) => {
                metrics::record_poll("ok");
                failures.record_success();

                match job.state {
                    JobState::Completed => {
                        slot.release();
                        metrics::record_terminal(JobState::Completed.as_str());
                        logger.log_completion("worker reported completion");
                        observer.on_complete(job);
                        return;
                    }
                    JobState::Failed => {
                        slot.release();
                        metrics::record_terminal(JobState::Failed.as_str());
                        let failure = JobFailure::from_job(job);
                        logger.log_error(&failure.reason);
                        observer.on_error(failure);
                        return;
                    }
                    JobState::Waiting | JobState::Active => {
                        // Monotonic progress is the worker's contract; pass it through as reported
                        if let Some(previous) = last_progress {
                            if job.progress < previous && job.state == JobState::Active {
                                debug!(
                                    job_id = %job_id,
                                    reported = job.progress,
                                    previous,
                                    "Worker reported a progress regression"
                                );
                            }
                        }
                        if last_progress != Some(job.progress) {
                            logger.log_progress(job.progress, job.state.as_str());
                        }
                        last_progress = Some(job.progress);

                        observer.on_progress(&job);
                        ctx.timer.sleep(ctx.config.interval).await;
                    }
                }
            }
            Err(e) => {
                metrics::record_poll("transport_error");
                if failures.record_failure() {
                    let message = format!(
                        "status poll failed, retrying in {:?}: {}",
                        ctx.config.backoff, e
                    );
                    // Still polled: the worker may recover or the job reappear
                    if e.is_retryable() {
                        logger.log_warning(&message);
                    } else {
                        logger.log_error(&message);
                    }
                }
                ctx.timer.sleep(ctx.config.backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;
    use vtc_client::TranscodeError;

    #[derive(Clone, Copy)]
    enum Step {
        Snapshot(JobState, u8),
        Http(u16),
    }

    /// Returns scripted snapshots per job, repeating the last step forever.
    #[derive(Default)]
    struct ScriptedSource {
        scripts: Mutex<HashMap<JobId, (Vec<Step>, usize)>>,
        calls: Mutex<Vec<JobId>>,
    }

    impl ScriptedSource {
        fn with(scripts: Vec<(&str, Vec<Step>)>) -> Arc<Self> {
            let source = Self::default();
            {
                let mut map = source.scripts.lock().unwrap();
                for (id, steps) in scripts {
                    map.insert(JobId::from(id), (steps, 0));
                }
            }
            Arc::new(source)
        }

        fn calls_for(&self, id: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|j| j.as_str() == id)
                .count()
        }
    }

    #[async_trait]
    impl JobStatusSource for ScriptedSource {
        async fn job_status(&self, job_id: &JobId) -> ClientResult<TranscodeJob> {
            self.calls.lock().unwrap().push(job_id.clone());
            let step = {
                let mut scripts = self.scripts.lock().unwrap();
                let (steps, cursor) = scripts.get_mut(job_id).expect("unscripted job");
                let step = steps[(*cursor).min(steps.len() - 1)];
                *cursor += 1;
                step
            };
            match step {
                Step::Snapshot(state, progress) => {
                    let mut job = TranscodeJob::submitted(job_id.clone());
                    job.state = state;
                    job.progress = progress;
                    if state == JobState::Failed {
                        job.error = Some("encoder crashed".into());
                    }
                    Ok(job)
                }
                Step::Http(status) => Err(TranscodeError::from_http_status(status, "boom")),
            }
        }
    }

    /// Records requested sleeps and only yields.
    #[derive(Default)]
    struct RecordingTimer {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Timer for RecordingTimer {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            tokio::task::yield_now().await;
        }
    }

    /// Records every callback with the (paused) time it arrived.
    struct RecordingObserver {
        started: Instant,
        events: Mutex<Vec<(String, JobId, u8, Duration)>>,
    }

    impl RecordingObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Instant::now(),
                events: Mutex::new(Vec::new()),
            })
        }

        fn push(&self, kind: &str, job: &TranscodeJob) {
            self.events.lock().unwrap().push((
                kind.to_string(),
                job.id.clone(),
                job.progress,
                self.started.elapsed(),
            ));
        }

        fn of_kind(&self, kind: &str) -> Vec<(JobId, u8, Duration)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, ..)| k == kind)
                .map(|(_, id, p, t)| (id.clone(), *p, *t))
                .collect()
        }
    }

    impl JobObserver for RecordingObserver {
        fn on_progress(&self, job: &TranscodeJob) {
            self.push("progress", job);
        }

        fn on_complete(&self, job: TranscodeJob) {
            self.push("complete", &job);
        }

        fn on_error(&self, failure: JobFailure) {
            self.push("error", &failure.job);
        }
    }

    fn poll_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(2),
            backoff: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_once() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "1",
            vec![
                Snapshot(JobState::Waiting, 0),
                Snapshot(JobState::Active, 40),
                Snapshot(JobState::Completed, 100),
            ],
        )]);
        let tracker = JobStateTracker::new(source.clone(), poll_config());
        let (observer, mut events) = ChannelObserver::new();

        tracker.watch_job(JobId::from("1"), Arc::new(observer)).unwrap();
        assert!(tracker.is_watching(&JobId::from("1")));

        let mut terminal = Vec::new();
        while let Some(event) = events.recv().await {
            if event.is_terminal() {
                terminal.push(event);
                break;
            }
        }
        assert!(matches!(terminal[0], JobEvent::Completed(ref job) if job.progress == 100));
        assert!(!tracker.is_watching(&JobId::from("1")));

        // No further polls or callbacks once terminal
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls_for("1"), 3);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reported_through_on_error() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "7",
            vec![Snapshot(JobState::Active, 10), Snapshot(JobState::Failed, 10)],
        )]);
        let tracker = JobStateTracker::new(source, poll_config());
        let (observer, mut events) = ChannelObserver::new();

        tracker.watch_job(JobId::from("7"), Arc::new(observer)).unwrap();

        loop {
            match events.recv().await.unwrap() {
                JobEvent::Failed(failure) => {
                    assert_eq!(failure.job_id.as_str(), "7");
                    assert_eq!(failure.reason, "encoder crashed");
                    break;
                }
                JobEvent::Completed(_) => panic!("failed job reported as complete"),
                JobEvent::Progress(_) => {}
            }
        }
        assert!(tracker.active_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_transient_error_backs_off_without_on_error() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "1",
            vec![
                Snapshot(JobState::Active, 10),
                Http(500),
                Snapshot(JobState::Active, 20),
                Snapshot(JobState::Completed, 100),
            ],
        )]);
        let timer = Arc::new(RecordingTimer::default());
        let tracker = JobStateTracker::with_timer(source, timer.clone(), poll_config());
        let observer = RecordingObserver::new();

        let group = tracker
            .watch_multiple_jobs(vec![JobId::from("1")], observer.clone())
            .unwrap();
        group.wait().await;

        assert!(observer.of_kind("error").is_empty());
        assert_eq!(observer.of_kind("complete").len(), 1);
        assert_eq!(
            *timer.sleeps.lock().unwrap(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_jobs_poll_independently() {
        use Step::*;
        let source = ScriptedSource::with(vec![
            (
                "j1",
                vec![
                    Snapshot(JobState::Waiting, 0),
                    Snapshot(JobState::Active, 50),
                    Snapshot(JobState::Completed, 100),
                ],
            ),
            (
                "j2",
                vec![
                    Snapshot(JobState::Waiting, 0),
                    Snapshot(JobState::Active, 20),
                    Snapshot(JobState::Active, 60),
                    Snapshot(JobState::Failed, 60),
                ],
            ),
        ]);
        let tracker = JobStateTracker::new(source.clone(), poll_config());
        let observer = RecordingObserver::new();

        let group = tracker
            .watch_multiple_jobs(vec![JobId::from("j1"), JobId::from("j2")], observer.clone())
            .unwrap();
        assert_eq!(group.active(), vec![JobId::from("j1"), JobId::from("j2")]);

        group.wait().await;
        assert!(group.is_done());
        assert!(group.active().is_empty());

        let completed = observer.of_kind("complete");
        let failed = observer.of_kind("error");
        assert_eq!(completed.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(completed[0].0.as_str(), "j1");
        assert_eq!(failed[0].0.as_str(), "j2");

        // j1 finishes on the third poll (t = 4s), one cycle ahead of j2 (t = 6s)
        assert!(completed[0].2 >= Duration::from_secs(4));
        assert!(completed[0].2 < Duration::from_secs(6));
        assert!(failed[0].2 >= Duration::from_secs(6));

        assert!(tracker.active_jobs().is_empty());
        assert_eq!(source.calls_for("j1"), 3);
        assert_eq!(source.calls_for("j2"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_passed_through_as_reported() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "1",
            vec![
                Snapshot(JobState::Waiting, 0),
                Snapshot(JobState::Active, 10),
                Snapshot(JobState::Active, 30),
                Snapshot(JobState::Active, 20),
                Snapshot(JobState::Active, 40),
                Snapshot(JobState::Completed, 100),
            ],
        )]);
        let tracker = JobStateTracker::new(source, poll_config());
        let observer = RecordingObserver::new();

        tracker
            .watch_multiple_jobs(vec![JobId::from("1")], observer.clone())
            .unwrap()
            .wait()
            .await;

        let progress: Vec<u8> = observer
            .of_kind("progress")
            .into_iter()
            .map(|(_, p, _)| p)
            .collect();
        // A regression from the worker reaches observers unchanged
        assert_eq!(progress, vec![0, 10, 30, 20, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monotonic_source_yields_monotonic_progress() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "1",
            vec![
                Snapshot(JobState::Active, 5),
                Snapshot(JobState::Active, 5),
                Snapshot(JobState::Active, 55),
                Snapshot(JobState::Active, 90),
                Snapshot(JobState::Completed, 100),
            ],
        )]);
        let tracker = JobStateTracker::new(source, poll_config());
        let observer = RecordingObserver::new();

        tracker
            .watch_multiple_jobs(vec![JobId::from("1")], observer.clone())
            .unwrap()
            .wait()
            .await;

        let progress: Vec<u8> = observer
            .of_kind("progress")
            .into_iter()
            .map(|(_, p, _)| p)
            .collect();
        assert_eq!(progress, vec![5, 5, 55, 90]);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_not_found_keeps_polling() {
        use Step::*;
        let source = ScriptedSource::with(vec![(
            "1",
            vec![Http(404), Http(404), Snapshot(JobState::Completed, 100)],
        )]);
        let timer = Arc::new(RecordingTimer::default());
        let tracker = JobStateTracker::with_timer(source.clone(), timer.clone(), poll_config());
        let observer = RecordingObserver::new();

        tracker
            .watch_multiple_jobs(vec![JobId::from("1")], observer.clone())
            .unwrap()
            .wait()
            .await;

        assert!(observer.of_kind("error").is_empty());
        assert_eq!(observer.of_kind("complete").len(), 1);
        assert_eq!(source.calls_for("1"), 3);
        assert_eq!(
            *timer.sleeps.lock().unwrap(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    /// Panics on the first progress callback.
    struct PanickingObserver;

    impl JobObserver for PanickingObserver {
        fn on_progress(&self, _job: &TranscodeJob) {
            panic!("observer bug");
        }

        fn on_complete(&self, _job: TranscodeJob) {}

        fn on_error(&self, _failure: JobFailure) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_observer_releases_watch() {
        let source = ScriptedSource::with(vec![("1", vec![Step::Snapshot(JobState::Active, 5)])]);
        let tracker = JobStateTracker::new(source, poll_config());
        let id = JobId::from("1");

        let group = tracker
            .watch_multiple_jobs(vec![id.clone()], Arc::new(PanickingObserver))
            .unwrap();
        group.wait().await;
        assert!(!tracker.is_watching(&id));

        // The id can be watched again after the task died
        let (observer, mut events) = ChannelObserver::new();
        tracker.watch_job(id.clone(), Arc::new(observer)).unwrap();
        match events.recv().await {
            Some(JobEvent::Progress(p)) => assert_eq!(p.progress, 5),
            other => panic!("expected progress, got {:?}", other),
        }
        assert!(tracker.is_watching(&id));
        assert_eq!(tracker.stop_all(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_watching_halts_polling() {
        let source = ScriptedSource::with(vec![("1", vec![Step::Snapshot(JobState::Active, 5)])]);
        let tracker = JobStateTracker::new(source.clone(), poll_config());
        let observer = RecordingObserver::new();

        let group = tracker
            .watch_multiple_jobs(vec![JobId::from("1")], observer.clone())
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(tracker.stop_watching(&JobId::from("1")));
        assert!(!tracker.stop_watching(&JobId::from("1")));
        assert!(!tracker.is_watching(&JobId::from("1")));

        group.wait().await;
        let polls = source.calls_for("1");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls_for("1"), polls);
        assert!(observer.of_kind("complete").is_empty());
        assert!(observer.of_kind("error").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_watch_rejected() {
        let source = ScriptedSource::with(vec![
            ("1", vec![Step::Snapshot(JobState::Active, 5)]),
            ("2", vec![Step::Snapshot(JobState::Active, 5)]),
        ]);
        let tracker = JobStateTracker::new(source, poll_config());
        let (observer, _events) = ChannelObserver::new();
        let observer: Arc<dyn JobObserver> = Arc::new(observer);

        tracker.watch_job(JobId::from("1"), observer.clone()).unwrap();
        let err = tracker
            .watch_job(JobId::from("1"), observer.clone())
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::AlreadyWatching(ref id) if id.as_str() == "1"));

        // Whole batch rejected, including the unwatched id
        let batch = tracker.watch_multiple_jobs(
            vec![JobId::from("2"), JobId::from("1")],
            observer.clone(),
        );
        assert!(batch.is_err());
        assert!(!tracker.is_watching(&JobId::from("2")));

        assert_eq!(tracker.stop_all(), 1);
        assert!(tracker.active_jobs().is_empty());
    }
}
