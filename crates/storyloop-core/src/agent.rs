use async_trait::async_trait;
use claude_driver::{AgentEvent, AgentRunner, RunOutcome, StderrSink};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoryloopError};

// ---------------------------------------------------------------------------
// AgentExecutor
// ---------------------------------------------------------------------------

/// Executes one agent session and streams its events to a handler.
///
/// The seam between the lifecycle engine and the real subprocess: production
/// code uses [`ClaudeExecutor`], tests substitute scripted executors.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run a prompt to completion and return the subprocess exit code.
    /// Cancellation surfaces as [`StoryloopError::Cancelled`].
    async fn execute(
        &self,
        prompt: &str,
        model: Option<&str>,
        on_event: &mut (dyn for<'a> FnMut(&'a AgentEvent) + Send),
        cancel: &CancellationToken,
    ) -> Result<i32>;
}

// ---------------------------------------------------------------------------
// ClaudeExecutor
// ---------------------------------------------------------------------------

/// Production executor backed by the `claude-driver` subprocess runner.
pub struct ClaudeExecutor {
    runner: AgentRunner,
}

impl ClaudeExecutor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            runner: AgentRunner::new(binary),
        }
    }

    pub fn with_stderr_sink(binary: impl Into<String>, sink: StderrSink) -> Self {
        Self {
            runner: AgentRunner::new(binary).with_stderr_sink(sink),
        }
    }
}

#[async_trait]
impl AgentExecutor for ClaudeExecutor {
    async fn execute(
        &self,
        prompt: &str,
        model: Option<&str>,
        on_event: &mut (dyn for<'a> FnMut(&'a AgentEvent) + Send),
        cancel: &CancellationToken,
    ) -> Result<i32> {
        match self.runner.run(prompt, model, on_event, cancel).await? {
            RunOutcome::Exited(code) => Ok(code),
            RunOutcome::Cancelled => Err(StoryloopError::Cancelled),
        }
    }
}
