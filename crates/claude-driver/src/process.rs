use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use crate::event::AgentEvent;
use crate::parser::EventParser;
use crate::runner::StderrSink;
use crate::{AgentError, Result};

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running agent subprocess.
///
/// Stdout is consumed through [`EventParser`] one event at a time; stderr is
/// drained line-by-line on a background task so it can never back-pressure
/// the stdout pipe.
pub(crate) struct AgentProcess {
    child: Child,
    parser: EventParser<ChildStdout>,
}

impl AgentProcess {
    /// Spawn the agent binary with the canonical argument set:
    /// permissions bypass, prompt, streaming output format, and the model
    /// flag only when a hint is given.
    ///
    /// `CLAUDECODE` is removed from the environment so the orchestrator
    /// works both from a terminal and from inside a running Claude session.
    pub(crate) fn spawn(
        binary: &str,
        prompt: &str,
        model: Option<&str>,
        stderr_sink: StderrSink,
    ) -> Result<Self> {
        let mut cmd = Command::new(binary);
        cmd.arg("--dangerously-skip-permissions")
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("stream-json");
        if let Some(model) = model {
            if !model.is_empty() {
                cmd.arg("--model").arg(model);
            }
        }
        cmd.env_remove("CLAUDECODE");

        Self::from_command(binary, cmd, stderr_sink)
    }

    /// Spawn an arbitrary command as a mock agent process.
    /// Used in unit tests to inject a command that emits fixed JSON lines.
    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command, stderr_sink: StderrSink) -> Result<Self> {
        Self::from_command("mock", cmd, stderr_sink)
    }

    fn from_command(binary: &str, mut cmd: Command, stderr_sink: StderrSink) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| AgentError::Spawn {
            binary: binary.to_owned(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Process("stdout not captured".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    stderr_sink(&line);
                }
            });
        }

        Ok(Self {
            child,
            parser: EventParser::new(stdout),
        })
    }

    /// Next event from stdout, or `None` once the stream is exhausted.
    pub(crate) async fn next_event(&mut self) -> std::io::Result<Option<AgentEvent>> {
        self.parser.next_event().await
    }

    /// Wait for the child to exit and return its exit code.
    ///
    /// A signal-terminated child has no code; report it as 1 so callers see
    /// a plain failure.
    pub(crate) async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await.map_err(AgentError::Io)?;
        Ok(status.code().unwrap_or(1))
    }

    /// Kill the subprocess (best-effort; errors are silently ignored).
    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}
