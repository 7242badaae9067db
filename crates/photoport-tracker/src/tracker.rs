//! The job tracker: start, verification, polling, stop and resume.

use crate::backend::JobBackend;
use crate::state::{StatusMessage, TerminalState, TrackerState, TrackerView};
use photoport_client::{ClientError, StartOutcome};
use photoport_types::{JobStatus, PendingCredentials, SessionId, TwoFactorChallenge};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Configuration for [`JobTracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Delay between status polls. The first poll happens one interval after
    /// the job starts.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of an operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The action was not applicable and nothing was sent.
    Ignored,
    /// The tracker is now in this state.
    Entered(TrackerState),
}

impl Transition {
    /// Returns true if the action was ignored.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Maps a result that raced with cancellation to [`ClientError::Cancelled`].
fn settle<T>(cancel: &CancellationToken, result: Result<T, ClientError>) -> Result<T, ClientError> {
    if cancel.is_cancelled() {
        Err(ClientError::Cancelled)
    } else {
        result
    }
}

/// Client-side lifecycle of one import job.
///
/// At most one start, verification or resume request is in flight at a time,
/// and at most one polling loop runs. Every change is published on a watch
/// channel, see [`subscribe`](Self::subscribe).
///
/// Cloning is cheap; clones drive the same job.
pub struct JobTracker<B> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: B,
    config: TrackerConfig,
    view: watch::Sender<TrackerView>,
    in_flight: AtomicBool,
    credentials: Mutex<Option<PendingCredentials>>,
    cancel: Mutex<Option<CancellationToken>>,
    poller: Mutex<Option<JoinHandle<()>>>,
    /// Bumped whenever polling starts or stops; a loop whose generation is
    /// stale must not touch the view.
    generation: AtomicU64,
}

impl<B> Drop for Inner<B> {
    fn drop(&mut self) {
        let poller = self.poller.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = poller.take() {
            task.abort();
        }
    }
}

/// Clears the in-flight flag when a request finishes, however it finishes.
struct InFlight<'a, B> {
    inner: &'a Inner<B>,
}

impl<B> Drop for InFlight<'_, B> {
    fn drop(&mut self) {
        lock(&self.inner.cancel).take();
        self.inner.in_flight.store(false, Ordering::SeqCst);
        self.inner.view.send_modify(|view| view.busy = false);
    }
}

impl<B> Clone for JobTracker<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for JobTracker<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.inner.view.borrow();
        f.debug_struct("JobTracker")
            .field("state", &view.state)
            .field("session_id", &view.session_id)
            .field("busy", &view.busy)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<B: JobBackend> JobTracker<B> {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new(backend: B, config: TrackerConfig) -> Self {
        let (view, _) = watch::channel(TrackerView::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                view,
                in_flight: AtomicBool::new(false),
                credentials: Mutex::new(None),
                cancel: Mutex::new(None),
                poller: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Returns the tracker configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Subscribes to view changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackerView> {
        self.inner.view.subscribe()
    }

    /// Returns a copy of the current view.
    #[must_use]
    pub fn view(&self) -> TrackerView {
        self.inner.view.borrow().clone()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TrackerState {
        self.inner.view.borrow().state
    }

    /// Returns true if [`stop`](Self::stop) would send a request.
    #[must_use]
    pub fn can_stop(&self) -> bool {
        self.inner.view.borrow().can_stop()
    }

    /// Starts an import.
    ///
    /// Ignored while another start or verification request is in flight. Any
    /// polling loop from a previous job is torn down first.
    pub async fn start(&self, credentials: PendingCredentials) -> Transition {
        let Some(_flight) = self.begin() else {
            debug!("start ignored, a request is already in flight");
            return Transition::Ignored;
        };

        self.stop_polling();
        let cancel = self.arm_cancel();
        *lock(&self.inner.credentials) = Some(credentials.clone());
        self.inner.view.send_modify(|view| {
            view.state = TrackerState::Idle;
            view.session_id = None;
            view.job = None;
            view.challenge = None;
            view.message = Some(StatusMessage::Connecting);
        });

        info!(email = %credentials.email, limit = %credentials.limit, "starting import");
        let result = self.inner.backend.start(&credentials, &cancel).await;
        let state = match settle(&cancel, result) {
            Ok(StartOutcome::Started(session_id)) => {
                self.begin_polling(session_id, StatusMessage::Started)
            }
            Ok(StartOutcome::TwoFactorRequired) => {
                info!("backend requested a verification code");
                self.enter(TrackerState::AwaitingTwoFactor, |view| {
                    view.challenge = Some(TwoFactorChallenge::default());
                    view.message = Some(StatusMessage::TwoFactorRequired);
                })
            }
            Ok(StartOutcome::Message(message)) => self.enter(TrackerState::Idle, |view| {
                view.message = Some(StatusMessage::Backend(message));
            }),
            Err(e) => {
                warn!("start request failed: {e}");
                self.enter(TrackerState::Idle, |view| {
                    view.message = Some(StatusMessage::from_error(&e));
                })
            }
        };
        Transition::Entered(state)
    }

    /// Replaces the verification code being typed. Returns false if no code
    /// is pending.
    pub fn enter_code(&self, code: impl Into<String>) -> bool {
        let code = code.into();
        self.inner
            .view
            .send_if_modified(|view| match view.challenge.as_mut() {
                Some(challenge) => {
                    challenge.set_code(code);
                    true
                }
                None => false,
            })
    }

    /// Clears the verification code being typed. Returns false if no code is
    /// pending.
    pub fn clear_code(&self) -> bool {
        self.inner
            .view
            .send_if_modified(|view| match view.challenge.as_mut() {
                Some(challenge) => {
                    challenge.clear();
                    true
                }
                None => false,
            })
    }

    /// Submits the entered verification code with the parameters of the
    /// original start request.
    ///
    /// A rejected code leaves the tracker awaiting a code, with the rejection
    /// as the status message.
    pub async fn submit_code(&self) -> Transition {
        let Some(_flight) = self.begin() else {
            debug!("verification ignored, a request is already in flight");
            return Transition::Ignored;
        };

        let view = self.view();
        let (TrackerState::AwaitingTwoFactor, Some(challenge)) = (view.state, view.challenge)
        else {
            debug!(state = %view.state, "verification ignored, no code is pending");
            return Transition::Ignored;
        };
        let Some(credentials) = self.credentials() else {
            return Transition::Ignored;
        };

        let cancel = self.arm_cancel();
        self.inner
            .view
            .send_modify(|view| view.message = Some(StatusMessage::ValidatingCode));

        let result = self
            .inner
            .backend
            .submit_two_factor_code(&credentials, challenge.code(), &cancel)
            .await;
        let state = match settle(&cancel, result) {
            Ok(StartOutcome::Started(session_id)) => {
                self.begin_polling(session_id, StatusMessage::StartedAfterTwoFactor)
            }
            Ok(StartOutcome::TwoFactorRequired) => self.awaiting(StatusMessage::TwoFactorRequired),
            Ok(StartOutcome::Message(message)) => {
                self.awaiting(StatusMessage::TwoFactorRejected(message))
            }
            Err(ClientError::Backend { detail, .. }) => {
                warn!("verification code rejected: {detail}");
                self.awaiting(StatusMessage::TwoFactorRejected(detail))
            }
            Err(e) => {
                warn!("verification request failed: {e}");
                self.awaiting(StatusMessage::from_error(&e))
            }
        };
        Transition::Entered(state)
    }

    /// Abandons a pending verification and returns to idle.
    pub fn cancel_two_factor(&self) -> Transition {
        let changed = self.inner.view.send_if_modified(|view| {
            if view.state != TrackerState::AwaitingTwoFactor {
                return false;
            }
            view.state = TrackerState::Idle;
            view.challenge = None;
            view.message = None;
            true
        });
        if !changed {
            return Transition::Ignored;
        }
        lock(&self.inner.credentials).take();
        info!("verification abandoned");
        Transition::Entered(TrackerState::Idle)
    }

    /// Cancels the in-flight start, verification or resume request, if any.
    ///
    /// The request resolves as interrupted. Returns false if nothing was in
    /// flight.
    pub fn cancel_in_flight(&self) -> bool {
        let token = lock(&self.inner.cancel).take();
        if let Some(token) = &token {
            token.cancel();
        }
        token.is_some()
    }

    /// Stops the running job.
    ///
    /// Ignored unless a job is running. The tracker is stopped and polling
    /// halted before the request is sent, so the outcome of the request never
    /// touches a job started meanwhile. A failed request is only logged.
    pub async fn stop(&self) -> Transition {
        let mut stopping = None;
        self.inner.view.send_if_modified(|view| {
            let Some(session_id) = view.session_id.clone().filter(|_| view.can_stop()) else {
                return false;
            };
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            view.state = TerminalState::Stopped.into();
            view.message = Some(StatusMessage::Stopped);
            stopping = Some(session_id);
            true
        });
        let Some(session_id) = stopping else {
            debug!(state = %self.state(), "stop ignored, no running job");
            return Transition::Ignored;
        };

        self.stop_polling();
        info!(%session_id, "stopping import");
        if let Err(e) = self.inner.backend.stop(&session_id).await {
            warn!(%session_id, "stop request failed: {e}");
        }
        Transition::Entered(TerminalState::Stopped.into())
    }

    /// Resumes a stopped job and polls it again.
    ///
    /// Ignored unless the tracker is stopped and still holds the credentials
    /// the job was started with. Cancelling the request, directly or through
    /// [`reset`](Self::reset), leaves the view as it is.
    pub async fn resume(&self) -> Transition {
        let Some(_flight) = self.begin() else {
            return Transition::Ignored;
        };

        let view = self.view();
        if view.state != TrackerState::Terminal(TerminalState::Stopped) {
            debug!(state = %view.state, "resume ignored, job is not stopped");
            return Transition::Ignored;
        }
        let (Some(session_id), Some(credentials)) = (view.session_id, self.credentials()) else {
            return Transition::Ignored;
        };

        let cancel = self.arm_cancel();
        info!(%session_id, "resuming import");
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.inner.backend.resume(&session_id, &credentials.password) => result,
        };
        let state = match settle(&cancel, result) {
            Ok(()) => self.begin_polling(session_id, StatusMessage::Resumed),
            Err(ClientError::Cancelled) => {
                info!(%session_id, "resume interrupted");
                self.state()
            }
            Err(e) => {
                warn!(%session_id, "resume request failed: {e}");
                self.enter(TerminalState::Stopped.into(), |view| {
                    view.message = Some(StatusMessage::from_error(&e));
                })
            }
        };
        Transition::Entered(state)
    }

    /// Drops all job state and returns to idle. Called on sign-out.
    ///
    /// Cancels any in-flight request, halts polling, and forgets the
    /// credentials.
    pub fn reset(&self) {
        self.cancel_in_flight();
        self.stop_polling();
        lock(&self.inner.credentials).take();
        let busy = self.inner.in_flight.load(Ordering::SeqCst);
        self.inner.view.send_modify(|view| {
            *view = TrackerView {
                busy,
                ..TrackerView::default()
            };
        });
        info!("tracker reset");
    }

    fn begin(&self) -> Option<InFlight<'_, B>> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.inner.view.send_modify(|view| view.busy = true);
        Some(InFlight { inner: &*self.inner })
    }

    fn arm_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.inner.cancel) = Some(token.clone());
        token
    }

    fn credentials(&self) -> Option<PendingCredentials> {
        lock(&self.inner.credentials).clone()
    }

    fn enter(&self, state: TrackerState, update: impl FnOnce(&mut TrackerView)) -> TrackerState {
        self.inner.view.send_modify(|view| {
            view.state = state;
            update(view);
        });
        state
    }

    fn awaiting(&self, message: StatusMessage) -> TrackerState {
        self.enter(TrackerState::AwaitingTwoFactor, |view| {
            view.message = Some(message);
        })
    }

    fn begin_polling(&self, session_id: SessionId, message: StatusMessage) -> TrackerState {
        info!(%session_id, "import running, polling status");
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.view.send_modify(|view| {
            view.state = TrackerState::Polling;
            view.session_id = Some(session_id.clone());
            view.challenge = None;
            view.message = Some(message);
        });

        let task = tokio::spawn(poll_loop(
            Arc::downgrade(&self.inner),
            session_id,
            generation,
        ));
        if let Some(previous) = lock(&self.inner.poller).replace(task) {
            previous.abort();
        }
        TrackerState::Polling
    }

    fn stop_polling(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = lock(&self.inner.poller).take() {
            task.abort();
        }
    }
}

impl From<TerminalState> for TrackerState {
    fn from(terminal: TerminalState) -> Self {
        Self::Terminal(terminal)
    }
}

/// Polls one job until it ends, the session disappears, or the loop is
/// superseded.
async fn poll_loop<B: JobBackend>(inner: Weak<Inner<B>>, session_id: SessionId, generation: u64) {
    loop {
        let Some(interval) = inner.upgrade().map(|i| i.config.poll_interval) else {
            return;
        };
        tokio::time::sleep(interval).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let current = || inner.generation.load(Ordering::SeqCst) == generation;

        match inner.backend.poll_status(&session_id).await {
            Ok(job) => {
                let status = job.status;
                let ending = match status {
                    JobStatus::Finished => Some((TerminalState::Finished, StatusMessage::Finished)),
                    JobStatus::Error => Some((TerminalState::Failed, StatusMessage::Failed)),
                    _ => None,
                };
                let done = ending.is_some();
                let applied = inner.view.send_if_modified(|view| {
                    if !current() {
                        return false;
                    }
                    debug!(%session_id, %status, progress = job.progress, total = ?job.total, "status polled");
                    view.job = Some(job);
                    if let Some((terminal, message)) = ending {
                        view.state = TrackerState::Terminal(terminal);
                        view.message = Some(message);
                    }
                    true
                });
                if !applied {
                    debug!(%session_id, "discarding status from a superseded poll");
                    return;
                }
                if done {
                    info!(%session_id, %status, "import ended");
                    return;
                }
            }
            Err(ClientError::SessionNotFound) => {
                inner.view.send_if_modified(|view| {
                    if !current() {
                        return false;
                    }
                    view.state = TerminalState::Expired.into();
                    view.message = Some(StatusMessage::SessionNotFound);
                    true
                });
                warn!(%session_id, "import session not found, polling stopped");
                return;
            }
            Err(e) => warn!(%session_id, "status poll failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use photoport_types::{FileToDownload, ImportJob, ImportLimit};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    type Outcome = Result<StartOutcome, ClientError>;

    #[derive(Default)]
    struct FakeBackend {
        start_delay: Duration,
        stop_delay: Duration,
        resume_delay: Duration,
        start_results: Mutex<VecDeque<Outcome>>,
        code_results: Mutex<VecDeque<Outcome>>,
        snapshots: Mutex<VecDeque<Result<ImportJob, ClientError>>>,
        codes: Mutex<Vec<(String, PendingCredentials)>>,
        polled: Mutex<Vec<SessionId>>,
        start_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        resume_calls: AtomicUsize,
    }

    impl FakeBackend {
        fn with_starts(results: Vec<Outcome>) -> Self {
            Self {
                start_results: Mutex::new(results.into()),
                ..Default::default()
            }
        }

        fn with_snapshots(snapshots: Vec<Result<ImportJob, ClientError>>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots.into()),
                ..Default::default()
            }
        }

        fn polled(&self) -> Vec<SessionId> {
            self.polled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobBackend for FakeBackend {
        async fn start(
            &self,
            _credentials: &PendingCredentials,
            cancel: &CancellationToken,
        ) -> Result<StartOutcome, ClientError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                () = cancel.cancelled() => return Err(ClientError::Cancelled),
                () = sleep(self.start_delay) => {}
            }
            self.start_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(StartOutcome::Started(SessionId::new("s-1"))))
        }

        async fn submit_two_factor_code(
            &self,
            credentials: &PendingCredentials,
            code: &str,
            _cancel: &CancellationToken,
        ) -> Result<StartOutcome, ClientError> {
            self.codes
                .lock()
                .unwrap()
                .push((code.to_string(), credentials.clone()));
            self.code_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(StartOutcome::TwoFactorRequired))
        }

        async fn stop(&self, _session_id: &SessionId) -> Result<(), ClientError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.stop_delay).await;
            Ok(())
        }

        async fn resume(&self, _session_id: &SessionId, password: &str) -> Result<(), ClientError> {
            assert_eq!(password, "secret");
            self.resume_calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.resume_delay).await;
            Ok(())
        }

        async fn poll_status(&self, session_id: &SessionId) -> Result<ImportJob, ClientError> {
            self.polled.lock().unwrap().push(session_id.clone());
            self.snapshots
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ImportJob::new(session_id.clone())))
        }
    }

    fn credentials() -> PendingCredentials {
        PendingCredentials::new(
            "me@icloud.com",
            "secret",
            "D:\\Photos\\2024",
            ImportLimit::Files(50),
        )
    }

    fn snapshot(status: JobStatus, progress: u64, total: u64, files: &[&str]) -> ImportJob {
        let mut job = ImportJob::new(SessionId::new("s-1"));
        job.status = status;
        job.progress = progress;
        job.total = Some(total);
        job.files_to_download = files
            .iter()
            .map(|name| FileToDownload {
                path: format!("2024/{name}"),
                download_token: format!("tok-{name}"),
            })
            .collect();
        job
    }

    fn tracker(backend: &Arc<FakeBackend>) -> JobTracker<Arc<FakeBackend>> {
        JobTracker::new(Arc::clone(backend), TrackerConfig::default())
    }

    fn file_names(view: &TrackerView) -> Vec<&str> {
        view.files().iter().map(FileToDownload::file_name).collect()
    }

    #[test]
    fn test_tracker_config_default() {
        assert_eq!(
            TrackerConfig::default().poll_interval,
            Duration::from_millis(2000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_start_sends_one_request() {
        let backend = Arc::new(FakeBackend {
            start_delay: Duration::from_secs(1),
            ..Default::default()
        });
        let tracker = tracker(&backend);

        let first = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.start(credentials()).await })
        };
        while !tracker.view().busy {
            tokio::task::yield_now().await;
        }

        assert_eq!(tracker.start(credentials()).await, Transition::Ignored);
        assert_eq!(
            first.await.unwrap(),
            Transition::Entered(TrackerState::Polling)
        );
        assert_eq!(backend.start_calls.load(Ordering::SeqCst), 1);
        assert!(!tracker.view().busy);
    }

    #[tokio::test]
    async fn test_stop_without_session_sends_nothing() {
        let backend = Arc::new(FakeBackend::default());
        let tracker = tracker(&backend);

        assert!(!tracker.can_stop());
        assert_eq!(tracker.stop().await, Transition::Ignored);
        assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_factor_flow() {
        let backend = Arc::new(FakeBackend::with_starts(vec![Ok(
            StartOutcome::TwoFactorRequired,
        )]));
        backend.code_results.lock().unwrap().extend([
            Err(ClientError::Backend {
                status: 400,
                detail: "Invalid verification code.".to_string(),
            }),
            Ok(StartOutcome::Started(SessionId::new("s-2"))),
        ]);
        let tracker = tracker(&backend);

        assert_eq!(
            tracker.start(credentials()).await,
            Transition::Entered(TrackerState::AwaitingTwoFactor)
        );
        let view = tracker.view();
        assert_eq!(view.session_id, None);
        assert_eq!(view.message, Some(StatusMessage::TwoFactorRequired));

        assert!(tracker.enter_code("000000"));
        assert_eq!(
            tracker.submit_code().await,
            Transition::Entered(TrackerState::AwaitingTwoFactor)
        );
        let view = tracker.view();
        assert_eq!(
            view.message,
            Some(StatusMessage::TwoFactorRejected(
                "Invalid verification code.".to_string()
            ))
        );
        assert_eq!(view.challenge.as_ref().map(|c| c.code()), Some("000000"));

        assert!(tracker.clear_code());
        assert_eq!(tracker.view().challenge.unwrap().code(), "");
        tracker.enter_code("123456");
        assert_eq!(
            tracker.submit_code().await,
            Transition::Entered(TrackerState::Polling)
        );

        let view = tracker.view();
        assert_eq!(view.session_id, Some(SessionId::new("s-2")));
        assert_eq!(view.challenge, None);
        assert_eq!(view.message, Some(StatusMessage::StartedAfterTwoFactor));

        let codes = backend.codes.lock().unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[1].0, "123456");
        assert_eq!(codes[1].1, credentials());
    }

    #[tokio::test]
    async fn test_code_entry_requires_challenge() {
        let backend = Arc::new(FakeBackend::default());
        let tracker = tracker(&backend);

        assert!(!tracker.enter_code("123456"));
        assert!(!tracker.clear_code());
        assert_eq!(tracker.submit_code().await, Transition::Ignored);
        assert!(backend.codes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_two_factor_returns_to_idle() {
        let backend = Arc::new(FakeBackend::with_starts(vec![Ok(
            StartOutcome::TwoFactorRequired,
        )]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        assert_eq!(
            tracker.cancel_two_factor(),
            Transition::Entered(TrackerState::Idle)
        );
        assert_eq!(tracker.view(), TrackerView::default());
        assert_eq!(tracker.cancel_two_factor(), Transition::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_replaces_snapshot_until_finished() {
        let backend = Arc::new(FakeBackend::with_snapshots(vec![
            Ok(snapshot(JobStatus::Running, 1, 3, &["a.jpg"])),
            Ok(snapshot(JobStatus::Running, 2, 3, &["b.jpg"])),
            Ok(snapshot(JobStatus::Finished, 3, 3, &["b.jpg", "c.heic"])),
        ]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_millis(4500)).await;
        let view = tracker.view();
        assert_eq!(view.state, TrackerState::Polling);
        assert_eq!(file_names(&view), vec!["b.jpg"]);
        assert_eq!(view.progress_percent(), Some(67));

        sleep(Duration::from_secs(10)).await;
        let view = tracker.view();
        assert_eq!(view.state, TrackerState::Terminal(TerminalState::Finished));
        assert_eq!(view.message, Some(StatusMessage::Finished));
        assert_eq!(file_names(&view), vec!["b.jpg", "c.heic"]);
        assert_eq!(backend.polled().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_ends_polling() {
        let mut failed = snapshot(JobStatus::Error, 4, 10, &[]);
        failed.errors = vec!["disk full".to_string()];
        let backend = Arc::new(FakeBackend::with_snapshots(vec![Ok(failed)]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_secs(10)).await;
        let view = tracker.view();
        assert_eq!(view.state, TrackerState::Terminal(TerminalState::Failed));
        assert_eq!(view.job.unwrap().errors, vec!["disk full"]);
        assert_eq!(backend.polled().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_not_found_ends_polling() {
        let backend = Arc::new(FakeBackend::with_snapshots(vec![Err(
            ClientError::SessionNotFound,
        )]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_secs(20)).await;
        let view = tracker.view();
        assert_eq!(view.state, TrackerState::Terminal(TerminalState::Expired));
        assert_eq!(view.message, Some(StatusMessage::SessionNotFound));
        assert_eq!(backend.polled().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_keeps_polling() {
        let backend = Arc::new(FakeBackend::with_snapshots(vec![
            Err(ClientError::Backend {
                status: 500,
                detail: "busy".to_string(),
            }),
            Ok(snapshot(JobStatus::Finished, 2, 2, &[])),
        ]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_secs(5)).await;
        assert_eq!(
            tracker.state(),
            TrackerState::Terminal(TerminalState::Finished)
        );
        assert_eq!(backend.polled().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_clamped() {
        let backend = Arc::new(FakeBackend::with_snapshots(vec![Ok(snapshot(
            JobStatus::Running,
            180,
            150,
            &[],
        ))]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(tracker.view().progress_percent(), Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_polling() {
        let backend = Arc::new(FakeBackend::default());
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_millis(2500)).await;
        assert!(tracker.can_stop());
        assert_eq!(
            tracker.stop().await,
            Transition::Entered(TrackerState::Terminal(TerminalState::Stopped))
        );
        assert_eq!(tracker.view().message, Some(StatusMessage::Stopped));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.polled().len(), 1);

        assert_eq!(tracker.stop().await, Transition::Ignored);
        assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_stop() {
        let backend = Arc::new(FakeBackend::default());
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;
        assert_eq!(tracker.resume().await, Transition::Ignored);

        tracker.stop().await;
        assert_eq!(
            tracker.resume().await,
            Transition::Entered(TrackerState::Polling)
        );
        assert_eq!(tracker.view().message, Some(StatusMessage::Resumed));
        assert_eq!(backend.resume_calls.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(backend.polled(), vec![SessionId::new("s-1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_start_replaces_polling_loop() {
        let backend = Arc::new(FakeBackend::with_starts(vec![
            Ok(StartOutcome::Started(SessionId::new("s-1"))),
            Ok(StartOutcome::Started(SessionId::new("s-2"))),
        ]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        sleep(Duration::from_secs(1)).await;
        tracker.start(credentials()).await;
        sleep(Duration::from_millis(2500)).await;

        assert_eq!(backend.polled(), vec![SessionId::new("s-2")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_start() {
        let backend = Arc::new(FakeBackend {
            start_delay: Duration::from_secs(30),
            ..Default::default()
        });
        let tracker = tracker(&backend);

        let pending = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.start(credentials()).await })
        };
        while !tracker.view().busy {
            tokio::task::yield_now().await;
        }

        assert!(tracker.cancel_in_flight());
        assert_eq!(
            pending.await.unwrap(),
            Transition::Entered(TrackerState::Idle)
        );
        let view = tracker.view();
        assert_eq!(view.message, Some(StatusMessage::Interrupted));
        assert_eq!(
            view.message.unwrap().to_string(),
            "Import interrupted by user."
        );
        assert!(!tracker.cancel_in_flight());
    }

    #[tokio::test]
    async fn test_start_failures_stay_idle() {
        let backend = Arc::new(FakeBackend::with_starts(vec![
            Ok(StartOutcome::Message("An import is already running.".to_string())),
            Err(ClientError::Backend {
                status: 500,
                detail: "Cloud sign-in failed".to_string(),
            }),
        ]));
        let tracker = tracker(&backend);

        tracker.start(credentials()).await;
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(
            tracker.view().message.unwrap().to_string(),
            "An import is already running."
        );

        tracker.start(credentials()).await;
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert_eq!(
            tracker.view().message.unwrap().to_string(),
            "Error: Cloud sign-in failed"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_job() {
        let backend = Arc::new(FakeBackend::default());
        let tracker = tracker(&backend);
        let mut updates = tracker.subscribe();
        tracker.start(credentials()).await;
        assert!(updates.has_changed().unwrap());

        tracker.reset();
        assert_eq!(tracker.view(), TrackerView::default());
        assert_eq!(tracker.resume().await, Transition::Ignored);

        sleep(Duration::from_secs(10)).await;
        assert!(backend.polled().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_during_stop_keeps_new_job() {
        let backend = Arc::new(FakeBackend {
            stop_delay: Duration::from_secs(1),
            start_results: Mutex::new(
                vec![
                    Ok(StartOutcome::Started(SessionId::new("s-1"))),
                    Ok(StartOutcome::Started(SessionId::new("s-2"))),
                ]
                .into(),
            ),
            ..Default::default()
        });
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;
        sleep(Duration::from_millis(2500)).await;

        let stopping = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.stop().await })
        };
        while tracker.state() != TrackerState::Terminal(TerminalState::Stopped) {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            tracker.start(credentials()).await,
            Transition::Entered(TrackerState::Polling)
        );
        assert_eq!(
            stopping.await.unwrap(),
            Transition::Entered(TrackerState::Terminal(TerminalState::Stopped))
        );

        sleep(Duration::from_millis(2500)).await;
        let view = tracker.view();
        assert_eq!(view.state, TrackerState::Polling);
        assert_eq!(view.session_id, Some(SessionId::new("s-2")));
        assert!(view.can_stop());
        assert_eq!(
            backend.polled(),
            vec![SessionId::new("s-1"), SessionId::new("s-2")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stops_send_one_request() {
        let backend = Arc::new(FakeBackend {
            stop_delay: Duration::from_secs(1),
            ..Default::default()
        });
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;

        let (first, second) = tokio::join!(tracker.stop(), tracker.stop());
        assert_eq!(
            first,
            Transition::Entered(TrackerState::Terminal(TerminalState::Stopped))
        );
        assert_eq!(second, Transition::Ignored);
        assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_resume_stays_idle() {
        let backend = Arc::new(FakeBackend {
            resume_delay: Duration::from_secs(1),
            ..Default::default()
        });
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;
        sleep(Duration::from_millis(2500)).await;
        tracker.stop().await;

        let resuming = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.resume().await })
        };
        while !tracker.view().busy {
            tokio::task::yield_now().await;
        }
        tracker.reset();

        assert_eq!(
            resuming.await.unwrap(),
            Transition::Entered(TrackerState::Idle)
        );
        sleep(Duration::from_secs(10)).await;
        assert_eq!(tracker.view(), TrackerView::default());
        assert_eq!(backend.polled(), vec![SessionId::new("s-1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_paused_job() {
        let backend = Arc::new(FakeBackend::with_snapshots(vec![Ok(snapshot(
            JobStatus::Paused,
            1,
            3,
            &[],
        ))]));
        let tracker = tracker(&backend);
        tracker.start(credentials()).await;
        sleep(Duration::from_millis(2500)).await;

        assert!(tracker.can_stop());
        assert_eq!(
            tracker.stop().await,
            Transition::Entered(TrackerState::Terminal(TerminalState::Stopped))
        );
        assert_eq!(backend.stop_calls.load(Ordering::SeqCst), 1);
    }
}
