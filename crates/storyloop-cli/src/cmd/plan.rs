use std::path::Path;

use storyloop_core::router::Route;
use storyloop_core::sprint::StatusAccess;

use crate::cmd::build_session;

/// Show the remaining lifecycle steps for a story without executing anything.
pub fn run(root: &Path, story: &str) -> anyhow::Result<()> {
    let session = build_session(root)?;

    match session.executor.plan(story)? {
        Route::Complete => {
            println!("Story {story} is already done.");
        }
        Route::Unknown => {
            let status = session.store.story_status(story)?;
            println!(
                "Story {story} has status '{status}', which is not in the routing table; \
                 `storyloop run {story}` will consult the agent for the next phase."
            );
        }
        Route::Steps(steps) => {
            println!("Remaining steps for {story}:");
            for (index, step) in steps.iter().enumerate() {
                let model = step
                    .model
                    .as_deref()
                    .map(|m| format!("  [model: {m}]"))
                    .unwrap_or_default();
                println!(
                    "  {}. {} → {}{model}",
                    index + 1,
                    step.phase,
                    step.next_status
                );
            }
        }
    }
    Ok(())
}
