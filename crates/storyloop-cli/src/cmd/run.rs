use std::path::Path;

use tokio_util::sync::CancellationToken;

use storyloop_core::lifecycle::Outcome;

use crate::cmd::build_session;

/// Run the full remaining lifecycle for one story.
pub async fn run(root: &Path, story: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let session = build_session(root)?;

    match session.executor.execute(story, cancel).await? {
        Outcome::Finished => {
            println!("\n✓ Story {story} complete.");
            Ok(())
        }
        Outcome::StoryComplete => {
            println!("Story {story} is already done — nothing to run.");
            Ok(())
        }
    }
}
