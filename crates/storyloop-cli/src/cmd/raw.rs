use std::path::Path;

use tokio_util::sync::CancellationToken;

use storyloop_core::StoryloopError;

use crate::cmd::build_session;

/// Run an arbitrary prompt through the agent. Mostly useful for testing a
/// project's agent setup without touching sprint state.
pub async fn run(root: &Path, prompt: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let session = build_session(root)?;

    let exit_code = session.workflow.run_raw(prompt, cancel).await?;
    if exit_code != 0 {
        return Err(StoryloopError::PhaseFailed {
            phase: "raw".to_owned(),
            code: exit_code,
        }
        .into());
    }
    Ok(())
}
