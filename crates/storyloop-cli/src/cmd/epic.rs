use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cmd::{build_session, queue};

/// Run every story in an epic, in story-number order.
pub async fn run(root: &Path, epic: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let session = build_session(root)?;
    let stories = session.store.epic_stories(epic)?;

    println!(
        "Epic {epic}: {} stor{}",
        stories.len(),
        if stories.len() == 1 { "y" } else { "ies" }
    );

    queue::run_batch(&session, &stories, cancel).await
}
