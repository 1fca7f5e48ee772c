use std::path::Path;

use tokio_util::sync::CancellationToken;

use storyloop_core::lifecycle::Outcome;

use crate::cmd::build_session;

/// Run only the next phase for a story, then stop.
pub async fn run(root: &Path, story: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let session = build_session(root)?;

    match session.executor.execute_next(story, cancel).await? {
        Outcome::Finished => {
            println!("\n✓ Step complete. Run `storyloop plan {story}` to see what remains.");
            Ok(())
        }
        Outcome::StoryComplete => {
            println!("Story {story} is already done — nothing to run.");
            Ok(())
        }
    }
}
