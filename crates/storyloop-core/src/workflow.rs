use std::sync::Arc;

use async_trait::async_trait;
use claude_driver::AgentEvent;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentExecutor;
use crate::config::{render_prompt, Config};
use crate::error::{Result, StoryloopError};
use crate::lifecycle::PhaseRunner;

/// Receives every agent event during a phase, in stream order. Supplied by
/// the embedding application (the CLI's terminal renderer).
pub type EventSink = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// WorkflowRunner
// ---------------------------------------------------------------------------

/// Thin adapter above the agent executor: resolves a phase's prompt template
/// and model from config, expands the story key, and forwards the session's
/// events to the configured sink.
pub struct WorkflowRunner {
    config: Config,
    executor: Arc<dyn AgentExecutor>,
    sink: EventSink,
}

impl WorkflowRunner {
    pub fn new(config: Config, executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            config,
            executor,
            sink: Arc::new(|_: &AgentEvent| {}),
        }
    }

    pub fn with_sink(mut self, sink: EventSink) -> Self {
        self.sink = sink;
        self
    }

    /// Run one phase for a story and return the agent's exit code.
    ///
    /// An unconfigured phase name is a configuration defect
    /// ([`StoryloopError::UnknownPhase`]), not a phase failure.
    pub async fn run_phase(
        &self,
        phase: &str,
        story: &str,
        cancel: &CancellationToken,
    ) -> Result<i32> {
        let phase_config = self
            .config
            .phase(phase)
            .ok_or_else(|| StoryloopError::UnknownPhase(phase.to_owned()))?;

        let prompt = render_prompt(&phase_config.prompt, story);
        let model = phase_config.model.as_deref();

        tracing::debug!(phase, story, model = model.unwrap_or("default"), "running phase");

        let sink = Arc::clone(&self.sink);
        let mut handler = move |event: &AgentEvent| sink(event);
        self.executor
            .execute(&prompt, model, &mut handler, cancel)
            .await
    }

    /// Run an arbitrary prompt through the agent with the default model.
    pub async fn run_raw(&self, prompt: &str, cancel: &CancellationToken) -> Result<i32> {
        let sink = Arc::clone(&self.sink);
        let mut handler = move |event: &AgentEvent| sink(event);
        self.executor.execute(prompt, None, &mut handler, cancel).await
    }
}

#[async_trait]
impl PhaseRunner for WorkflowRunner {
    async fn run_phase(&self, phase: &str, story: &str, cancel: &CancellationToken) -> Result<i32> {
        WorkflowRunner::run_phase(self, phase, story, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
