use std::path::Path;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use storyloop_core::lifecycle::Outcome;
use storyloop_core::StoryloopError;

use crate::cmd::{build_session, Session};
use crate::output::{self, StoryResult};

/// Run the full lifecycle for each story in order.
///
/// Missing stories are reported and skipped; already-done stories are
/// skipped; the first real failure stops the batch with the remaining
/// stories untouched.
pub async fn run(root: &Path, stories: &[String], cancel: &CancellationToken) -> anyhow::Result<()> {
    let session = build_session(root)?;
    run_batch(&session, stories, cancel).await
}

pub(crate) async fn run_batch(
    session: &Session,
    stories: &[String],
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let total = stories.len();
    let mut results: Vec<StoryResult> = Vec::with_capacity(total);

    for (index, story) in stories.iter().enumerate() {
        output::story_banner(index + 1, total, story);
        let started = Instant::now();

        match session.executor.execute(story, cancel).await {
            Ok(Outcome::Finished) => results.push(StoryResult {
                story: story.clone(),
                mark: '✓',
                note: format!("{:.0?}", started.elapsed()),
            }),
            Ok(Outcome::StoryComplete) => results.push(StoryResult {
                story: story.clone(),
                mark: '○',
                note: "already done".into(),
            }),
            Err(StoryloopError::StoryNotFound(key)) => {
                eprintln!("story not found, skipping: {key}");
                results.push(StoryResult {
                    story: story.clone(),
                    mark: '?',
                    note: "not found".into(),
                });
            }
            Err(err) => {
                results.push(StoryResult {
                    story: story.clone(),
                    mark: '✗',
                    note: err.to_string(),
                });
                output::batch_summary(&results, &stories[index + 1..]);
                return Err(err.into());
            }
        }
    }

    output::batch_summary(&results, &[]);
    Ok(())
}
