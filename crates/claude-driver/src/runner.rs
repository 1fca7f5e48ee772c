use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::event::AgentEvent;
use crate::process::AgentProcess;
use crate::Result;

// ─── Types ────────────────────────────────────────────────────────────────

/// Receives each stderr line from the agent subprocess.
///
/// Stderr carries diagnostic text (rate-limit notices, auth warnings); the
/// sink is supplied by the embedding application and must not block.
pub type StderrSink = Arc<dyn Fn(&str) + Send + Sync>;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The subprocess ran to completion; the exit code is the authoritative
    /// success/failure signal (0 = success).
    Exited(i32),
    /// The cancellation token fired; the subprocess was killed and the
    /// handler stopped receiving events.
    Cancelled,
}

// ─── AgentRunner ──────────────────────────────────────────────────────────

/// Runs a single agent session and streams its events to a handler.
///
/// The runner pulls the parser directly — single producer, single consumer —
/// so every event reaches the handler in stream order before the next stdout
/// line is read. This ordering is load-bearing for progress rendering.
pub struct AgentRunner {
    binary: String,
    stderr_sink: StderrSink,
}

impl AgentRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            stderr_sink: Arc::new(|line: &str| {
                tracing::debug!(target: "agent_stderr", "{line}");
            }),
        }
    }

    /// Replace the default stderr sink (a `tracing` debug log).
    pub fn with_stderr_sink(mut self, sink: StderrSink) -> Self {
        self.stderr_sink = sink;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run one session: spawn, stream events to `on_event`, wait for exit.
    ///
    /// Spawn failure surfaces as [`crate::AgentError::Spawn`] before any
    /// event is delivered. A read error on stdout ends the event stream but
    /// the exit code is still collected — the agent's exit status stays
    /// authoritative.
    pub async fn run(
        &self,
        prompt: &str,
        model: Option<&str>,
        on_event: &mut (dyn FnMut(&AgentEvent) + Send),
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let process = AgentProcess::spawn(
            &self.binary,
            prompt,
            model,
            Arc::clone(&self.stderr_sink),
        )?;
        drive(process, on_event, cancel).await
    }
}

/// Consume a spawned process to completion.
///
/// Split out from [`AgentRunner::run`] so tests can inject an arbitrary
/// command as the agent.
async fn drive(
    mut process: AgentProcess,
    on_event: &mut (dyn FnMut(&AgentEvent) + Send),
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            event = process.next_event() => Some(event),
        };
        match next {
            None => {
                process.kill().await;
                return Ok(RunOutcome::Cancelled);
            }
            Some(Ok(Some(event))) => on_event(&event),
            Some(Ok(None)) => break,
            Some(Err(e)) => {
                tracing::debug!("agent stdout read error: {e}");
                break;
            }
        }
    }

    let code = process.wait().await?;
    Ok(RunOutcome::Exited(code))
}

// ─── Tests ────────────────────────────────────────────────────────────────
