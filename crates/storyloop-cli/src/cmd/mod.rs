pub mod epic;
pub mod next;
pub mod phase;
pub mod plan;
pub mod queue;
pub mod raw;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use storyloop_core::agent::ClaudeExecutor;
use storyloop_core::config::Config;
use storyloop_core::fallback::HelpFallback;
use storyloop_core::lifecycle::Executor;
use storyloop_core::manifest::{ModuleManifest, WorkflowManifest};
use storyloop_core::paths;
use storyloop_core::router::Router;
use storyloop_core::sprint::StatusStore;
use storyloop_core::workflow::{EventSink, WorkflowRunner};
use storyloop_core::StoryStatus;

use crate::output;

/// Everything a command needs, wired once per invocation.
pub struct Session {
    pub store: Arc<StatusStore>,
    pub executor: Executor,
    pub workflow: Arc<WorkflowRunner>,
}

/// Build the component stack for a project root: config, status store,
/// agent executor, router (manifest-driven when a manifest is present, with
/// module plug-ins applied), lifecycle executor with fallback and progress
/// banner installed.
pub fn build_session(root: &Path) -> anyhow::Result<Session> {
    let config = Config::load(root).context("failed to load config")?;

    let store = Arc::new(StatusStore::new(
        root,
        config.sprint.status_path.as_deref(),
    ));

    let agent = Arc::new(ClaudeExecutor::with_stderr_sink(
        config.agent_binary(),
        Arc::new(|line: &str| eprintln!("[agent] {line}")),
    ));

    let sink: EventSink = Arc::new(output::render_event);
    let agent_seam: Arc<dyn storyloop_core::agent::AgentExecutor> = agent.clone() as Arc<dyn storyloop_core::agent::AgentExecutor>;
    let workflow = Arc::new(WorkflowRunner::new(config, agent_seam).with_sink(sink));

    let mut router = load_router(root).context("failed to load workflow manifest")?;
    apply_modules(root, &mut router).context("failed to load module manifest")?;

    let runner: Arc<dyn storyloop_core::lifecycle::PhaseRunner> = workflow.clone() as Arc<dyn storyloop_core::lifecycle::PhaseRunner>;
    let status: Arc<dyn storyloop_core::sprint::StatusAccess> = store.clone() as Arc<dyn storyloop_core::sprint::StatusAccess>;
    let mut executor = Executor::new(runner, status);
    executor.set_router(router);
    executor.set_fallback(Arc::new(HelpFallback::new(agent)));
    executor.set_progress_callback(Box::new(output::step_banner));

    Ok(Session {
        store,
        executor,
        workflow,
    })
}

fn load_router(root: &Path) -> anyhow::Result<Router> {
    let manifest_path = paths::workflow_manifest_path(root);
    if !manifest_path.exists() {
        return Ok(Router::default());
    }
    let manifest = WorkflowManifest::from_path(&manifest_path)?;
    tracing::debug!(path = %manifest_path.display(), phases = ?manifest.phases(), "manifest router");
    Ok(Router::from_manifest(&manifest)?)
}

/// Module plug-ins run once at startup, before any execution: installed
/// test-automation modules add their phase after review-phase.
fn apply_modules(root: &Path, router: &mut Router) -> anyhow::Result<()> {
    let modules_path = paths::modules_path(root);
    if !modules_path.exists() {
        return Ok(());
    }
    let modules = ModuleManifest::from_path(&modules_path)?;
    if modules.wants_test_automation() {
        router.insert_after("review-phase", "test-automation", StoryStatus::Done);
        tracing::debug!(modules = ?modules.names(), "test-automation phase enabled");
    }
    Ok(())
}
