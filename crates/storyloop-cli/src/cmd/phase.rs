use std::path::Path;

use tokio_util::sync::CancellationToken;

use storyloop_core::StoryloopError;

use crate::cmd::build_session;

/// Run one named phase for a story, with no status bookkeeping.
///
/// The workhorse behind the `draft` / `implement` / `review` / `commit`
/// commands: useful for re-running a single phase by hand.
pub async fn run(
    root: &Path,
    phase: &str,
    story: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let session = build_session(root)?;

    let exit_code = session.workflow.run_phase(phase, story, cancel).await?;
    if exit_code != 0 {
        return Err(StoryloopError::PhaseFailed {
            phase: phase.to_owned(),
            code: exit_code,
        }
        .into());
    }
    Ok(())
}
