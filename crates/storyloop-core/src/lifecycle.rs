use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoryloopError};
use crate::fallback::FallbackResolver;
use crate::router::{LifecycleStep, Route, Router};
use crate::sprint::StatusAccess;

/// Limit on consecutive fallback-derived passes. Stops the executor from
/// looping forever when the fallback keeps landing on statuses the router
/// doesn't recognise.
pub const MAX_FALLBACK_DEPTH: u32 = 3;

/// Invoked once per step, before the phase's subprocess starts:
/// `(1-based step index, total steps, phase name)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Executes one phase for a story and reports the agent's exit code.
/// Implemented by [`crate::workflow::WorkflowRunner`] in production and by
/// scripted runners in tests.
#[async_trait]
pub trait PhaseRunner: Send + Sync {
    async fn run_phase(&self, phase: &str, story: &str, cancel: &CancellationToken) -> Result<i32>;
}

/// How a lifecycle run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remaining chain ran to completion.
    Finished,
    /// The story was already `done` — callers should skip, not fail.
    StoryComplete,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Drives a story from its current status through the remaining phase chain.
///
/// Each pass re-reads the persisted status, asks the router for the chain
/// suffix, and runs the phases in order, persisting each step's next status
/// on success. Execution is fail-fast: the first non-zero exit or failed
/// status write stops the run, with earlier updates already on disk so the
/// next invocation resumes mid-chain.
pub struct Executor {
    runner: Arc<dyn PhaseRunner>,
    status: Arc<dyn StatusAccess>,
    router: Router,
    fallback: Option<Arc<dyn FallbackResolver>>,
    progress: Option<ProgressCallback>,
}

impl Executor {
    pub fn new(runner: Arc<dyn PhaseRunner>, status: Arc<dyn StatusAccess>) -> Self {
        Self {
            runner,
            status,
            router: Router::default(),
            fallback: None,
            progress: None,
        }
    }

    /// Replace the default router (e.g. with a manifest-driven one).
    pub fn set_router(&mut self, router: Router) {
        self.router = router;
    }

    /// Install the unknown-status fallback. Without one, unknown statuses
    /// are terminal errors.
    pub fn set_fallback(&mut self, fallback: Arc<dyn FallbackResolver>) {
        self.fallback = Some(fallback);
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run the full remaining lifecycle for a story.
    ///
    /// A fallback-derived pass executes the single recommended phase, then
    /// loops back to re-read the status with a bumped depth counter — the
    /// phase usually moves the story somewhere the router recognises.
    pub async fn execute(&self, story: &str, cancel: &CancellationToken) -> Result<Outcome> {
        let mut depth: u32 = 0;

        loop {
            let current = self.status.story_status(story)?;

            let (steps, fallback_derived) = match self.router.lifecycle(&current) {
                Route::Complete => return Ok(Outcome::StoryComplete),
                Route::Steps(steps) => (steps, false),
                Route::Unknown => {
                    let Some(fallback) = &self.fallback else {
                        return Err(StoryloopError::UnknownStatus {
                            story: story.to_owned(),
                            status: current.as_str().to_owned(),
                        });
                    };
                    if depth >= MAX_FALLBACK_DEPTH {
                        return Err(StoryloopError::FallbackDepthExceeded {
                            status: current.as_str().to_owned(),
                            depth: MAX_FALLBACK_DEPTH,
                        });
                    }
                    let recommendation = fallback
                        .resolve(story, &current, cancel)
                        .await
                        .map_err(|source| StoryloopError::FallbackFailed {
                            status: current.as_str().to_owned(),
                            source: Box::new(source),
                        })?;
                    tracing::info!(
                        story,
                        status = %current,
                        phase = %recommendation.phase,
                        "fallback recommendation"
                    );
                    let step = LifecycleStep {
                        phase: recommendation.phase,
                        next_status: recommendation.next_status,
                        model: None,
                    };
                    (vec![step], true)
                }
            };

            self.run_steps(story, &steps, cancel).await?;

            if fallback_derived {
                depth += 1;
                continue;
            }
            return Ok(Outcome::Finished);
        }
    }

    /// Run exactly one step — the next phase for the story's status.
    pub async fn execute_next(&self, story: &str, cancel: &CancellationToken) -> Result<Outcome> {
        let current = self.status.story_status(story)?;
        match self.router.single(&current) {
            Route::Complete => Ok(Outcome::StoryComplete),
            Route::Unknown => Err(StoryloopError::UnknownStatus {
                story: story.to_owned(),
                status: current.as_str().to_owned(),
            }),
            Route::Steps(steps) => {
                self.run_steps(story, &steps, cancel).await?;
                Ok(Outcome::Finished)
            }
        }
    }

    /// Compute the remaining steps without executing anything.
    pub fn plan(&self, story: &str) -> Result<Route> {
        let current = self.status.story_status(story)?;
        Ok(self.router.lifecycle(&current))
    }

    async fn run_steps(
        &self,
        story: &str,
        steps: &[LifecycleStep],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            if let Some(progress) = &self.progress {
                progress(index + 1, total, &step.phase);
            }

            let exit_code = self.runner.run_phase(&step.phase, story, cancel).await?;
            if exit_code != 0 {
                return Err(StoryloopError::PhaseFailed {
                    phase: step.phase.clone(),
                    code: exit_code,
                });
            }

            self.status
                .update_status(story, &step.next_status)
                .map_err(|source| StoryloopError::StatusUpdate {
                    story: story.to_owned(),
                    phase: step.phase.clone(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::Recommendation;
    use crate::status::StoryStatus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory status store. Deliberately skips the recognised-status
    /// validation the file store performs, so fallback loops can be driven
    /// through unrecognised statuses.
    struct MemoryStore {
        statuses: Mutex<HashMap<String, StoryStatus>>,
        updates: Mutex<Vec<(String, StoryStatus)>>,
        fail_updates: bool,
    }

    impl MemoryStore {
        fn with(story: &str, status: StoryStatus) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(HashMap::from([(story.to_owned(), status)])),
                updates: Mutex::new(Vec::new()),
                fail_updates: false,
            })
        }

        fn failing_updates(story: &str, status: StoryStatus) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(HashMap::from([(story.to_owned(), status)])),
                updates: Mutex::new(Vec::new()),
                fail_updates: true,
            })
        }

        fn current(&self, story: &str) -> StoryStatus {
            self.statuses.lock().unwrap()[story].clone()
        }

        fn update_count(&self) -> usize {
            self.updates.lock().unwrap().len()
        }
    }

    impl StatusAccess for MemoryStore {
        fn story_status(&self, story: &str) -> Result<StoryStatus> {
            self.statuses
                .lock()
                .unwrap()
                .get(story)
                .cloned()
                .ok_or_else(|| StoryloopError::StoryNotFound(story.to_owned()))
        }

        fn update_status(&self, story: &str, status: &StoryStatus) -> Result<()> {
            if self.fail_updates {
                return Err(StoryloopError::Io(std::io::Error::other("disk full")));
            }
            self.statuses
                .lock()
                .unwrap()
                .insert(story.to_owned(), status.clone());
            self.updates
                .lock()
                .unwrap()
                .push((story.to_owned(), status.clone()));
            Ok(())
        }
    }

    /// Scripted phase runner: per-phase exit codes, default success.
    struct ScriptedRunner {
        calls: Mutex<Vec<String>>,
        exit_codes: HashMap<String, i32>,
        cancel_on: Option<String>,
    }

    impl ScriptedRunner {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                exit_codes: HashMap::new(),
                cancel_on: None,
            })
        }

        fn failing(phase: &str, code: i32) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                exit_codes: HashMap::from([(phase.to_owned(), code)]),
                cancel_on: None,
            })
        }

        fn cancelling_on(phase: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                exit_codes: HashMap::new(),
                cancel_on: Some(phase.to_owned()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PhaseRunner for ScriptedRunner {
        async fn run_phase(
            &self,
            phase: &str,
            _story: &str,
            _cancel: &CancellationToken,
        ) -> Result<i32> {
            self.calls.lock().unwrap().push(phase.to_owned());
            if self.cancel_on.as_deref() == Some(phase) {
                return Err(StoryloopError::Cancelled);
            }
            Ok(self.exit_codes.get(phase).copied().unwrap_or(0))
        }
    }

    /// Fallback returning a fixed recommendation, counting invocations.
    struct FixedFallback {
        recommendation: Recommendation,
        calls: Mutex<u32>,
    }

    impl FixedFallback {
        fn new(phase: &str, next_status: StoryStatus) -> Arc<Self> {
            Arc::new(Self {
                recommendation: Recommendation {
                    phase: phase.to_owned(),
                    next_status,
                },
                calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl FallbackResolver for FixedFallback {
        async fn resolve(
            &self,
            _story: &str,
            _status: &StoryStatus,
            _cancel: &CancellationToken,
        ) -> Result<Recommendation> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.recommendation.clone())
        }
    }

    fn executor(runner: Arc<ScriptedRunner>, store: Arc<MemoryStore>) -> Executor {
        Executor::new(runner, store)
    }

    #[tokio::test]
    async fn backlog_runs_the_full_chain_to_done() {
        // S1: four phases, four transitions, four progress callbacks.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::Backlog);
        let mut exec = executor(runner.clone(), store.clone());

        let progress: Arc<Mutex<Vec<(usize, usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let progress = Arc::clone(&progress);
            exec.set_progress_callback(Box::new(move |i, n, phase| {
                progress.lock().unwrap().push((i, n, phase.to_owned()));
            }));
        }

        let outcome = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(
            runner.calls(),
            vec!["draft", "implement", "review-phase", "commit"]
        );
        assert_eq!(store.current("STORY-1"), StoryStatus::Done);
        assert_eq!(
            store.updates.lock().unwrap().as_slice(),
            &[
                ("STORY-1".to_owned(), StoryStatus::ReadyForDev),
                ("STORY-1".to_owned(), StoryStatus::Review),
                ("STORY-1".to_owned(), StoryStatus::Done),
                ("STORY-1".to_owned(), StoryStatus::Done),
            ]
        );
        assert_eq!(
            progress.lock().unwrap().as_slice(),
            &[
                (1, 4, "draft".to_owned()),
                (2, 4, "implement".to_owned()),
                (3, 4, "review-phase".to_owned()),
                (4, 4, "commit".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn mid_chain_entry_runs_only_the_suffix() {
        // S2: review → review-phase, commit with totals of 2.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::Review);
        let mut exec = executor(runner.clone(), store.clone());

        let progress: Arc<Mutex<Vec<(usize, usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
        {
            let progress = Arc::clone(&progress);
            exec.set_progress_callback(Box::new(move |i, n, phase| {
                progress.lock().unwrap().push((i, n, phase.to_owned()));
            }));
        }

        exec.execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(runner.calls(), vec!["review-phase", "commit"]);
        assert_eq!(store.current("STORY-1"), StoryStatus::Done);
        assert_eq!(
            progress.lock().unwrap().as_slice(),
            &[(1, 2, "review-phase".to_owned()), (2, 2, "commit".to_owned())]
        );
    }

    #[tokio::test]
    async fn done_story_is_skipped_without_side_effects() {
        // S3.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::Done);
        let exec = executor(runner.clone(), store.clone());

        let outcome = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::StoryComplete);
        assert!(runner.calls().is_empty());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn fail_fast_preserves_partial_progress() {
        // S4 / property 6: k phases attempted, k-1 updates persisted.
        let runner = ScriptedRunner::failing("implement", 1);
        let store = MemoryStore::with("STORY-1", StoryStatus::Backlog);
        let exec = executor(runner.clone(), store.clone());

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            StoryloopError::PhaseFailed { phase, code } => {
                assert_eq!(phase, "implement");
                assert_eq!(code, 1);
            }
            other => panic!("expected PhaseFailed, got {other}"),
        }
        assert_eq!(runner.calls(), vec!["draft", "implement"]);
        assert_eq!(store.update_count(), 1);
        assert_eq!(store.current("STORY-1"), StoryStatus::ReadyForDev);
    }

    #[tokio::test]
    async fn unknown_status_with_fallback_recovers_and_completes() {
        // S5: fallback bridges pending-qa → review-phase → done, then the
        // re-entered loop sees done and reports StoryComplete.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::from("pending-qa"));
        let fallback = FixedFallback::new("review-phase", StoryStatus::Done);
        let mut exec = executor(runner.clone(), store.clone());
        exec.set_fallback(fallback.clone());

        let outcome = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::StoryComplete);
        assert_eq!(runner.calls(), vec!["review-phase"]);
        assert_eq!(store.current("STORY-1"), StoryStatus::Done);
        assert_eq!(*fallback.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_status_without_fallback_fails_immediately() {
        // S6.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::from("pending-qa"));
        let exec = executor(runner.clone(), store.clone());

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StoryloopError::UnknownStatus { .. }));
        assert!(runner.calls().is_empty());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn fallback_depth_is_limited_to_exactly_three_invocations() {
        // Property 5: the recommendation's next status is itself
        // unrecognised, so every pass re-enters the fallback.
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::from("limbo"));
        let fallback = FixedFallback::new("commit", StoryStatus::from("still-limbo"));
        let mut exec = executor(runner.clone(), store.clone());
        exec.set_fallback(fallback.clone());

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoryloopError::FallbackDepthExceeded { depth: 3, .. }
        ));
        assert_eq!(*fallback.calls.lock().unwrap(), 3);
        assert_eq!(runner.calls().len(), 3);
    }

    #[tokio::test]
    async fn fallback_errors_are_wrapped_with_the_offending_status() {
        struct BrokenFallback;

        #[async_trait]
        impl FallbackResolver for BrokenFallback {
            async fn resolve(
                &self,
                _story: &str,
                _status: &StoryStatus,
                _cancel: &CancellationToken,
            ) -> Result<Recommendation> {
                Err(StoryloopError::FallbackUnparseable)
            }
        }

        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::from("limbo"));
        let mut exec = executor(runner, store);
        exec.set_fallback(Arc::new(BrokenFallback));

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            StoryloopError::FallbackFailed { status, source } => {
                assert_eq!(status, "limbo");
                assert!(matches!(*source, StoryloopError::FallbackUnparseable));
            }
            other => panic!("expected FallbackFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn status_update_failure_names_the_finished_phase() {
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::failing_updates("STORY-1", StoryStatus::Review);
        let exec = executor(runner.clone(), store);

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            StoryloopError::StatusUpdate { phase, .. } => assert_eq!(phase, "review-phase"),
            other => panic!("expected StatusUpdate, got {other}"),
        }
        // The phase ran; only the bookkeeping failed. No second phase starts.
        assert_eq!(runner.calls(), vec!["review-phase"]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_chain_without_an_update() {
        let runner = ScriptedRunner::cancelling_on("implement");
        let store = MemoryStore::with("STORY-1", StoryStatus::Backlog);
        let exec = executor(runner.clone(), store.clone());

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StoryloopError::Cancelled));
        assert_eq!(runner.calls(), vec!["draft", "implement"]);
        // draft's update persisted; the cancelled phase wrote nothing.
        assert_eq!(store.update_count(), 1);
        assert_eq!(store.current("STORY-1"), StoryStatus::ReadyForDev);
    }

    #[tokio::test]
    async fn progress_callback_fires_before_each_phase_starts() {
        struct LoggingRunner {
            log: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl PhaseRunner for LoggingRunner {
            async fn run_phase(
                &self,
                phase: &str,
                _story: &str,
                _cancel: &CancellationToken,
            ) -> Result<i32> {
                self.log.lock().unwrap().push(format!("run:{phase}"));
                Ok(0)
            }
        }

        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let store = MemoryStore::with("STORY-1", StoryStatus::Review);
        let mut exec = Executor::new(Arc::new(LoggingRunner { log: log.clone() }), store);
        {
            let log = log.clone();
            exec.set_progress_callback(Box::new(move |i, n, phase| {
                log.lock().unwrap().push(format!("cb:{i}/{n}:{phase}"));
            }));
        }

        exec.execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[
                "cb:1/2:review-phase".to_owned(),
                "run:review-phase".to_owned(),
                "cb:2/2:commit".to_owned(),
                "run:commit".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_story_propagates_not_found() {
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("OTHER", StoryStatus::Backlog);
        let exec = executor(runner, store);

        let err = exec
            .execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoryloopError::StoryNotFound(_)));
    }

    #[tokio::test]
    async fn plan_is_a_dry_run() {
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::InProgress);
        let exec = executor(runner.clone(), store.clone());

        let route = exec.plan("STORY-1").unwrap();
        let Route::Steps(steps) = route else {
            panic!("expected steps")
        };
        assert_eq!(steps.len(), 3);
        assert!(runner.calls().is_empty());
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn execute_next_runs_exactly_one_step() {
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::Backlog);
        let exec = executor(runner.clone(), store.clone());

        let outcome = exec
            .execute_next("STORY-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Finished);
        assert_eq!(runner.calls(), vec!["draft"]);
        assert_eq!(store.current("STORY-1"), StoryStatus::ReadyForDev);
    }

    #[tokio::test]
    async fn injected_router_changes_the_chain() {
        let runner = ScriptedRunner::ok();
        let store = MemoryStore::with("STORY-1", StoryStatus::Review);
        let mut exec = executor(runner.clone(), store);

        let mut router = Router::default();
        router.insert_after("review-phase", "test-automation", StoryStatus::Done);
        exec.set_router(router);

        exec.execute("STORY-1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec!["review-phase", "test-automation", "commit"]
        );
    }
}
