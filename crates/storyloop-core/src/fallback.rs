use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentExecutor;
use crate::error::{Result, StoryloopError};
use crate::status::StoryStatus;

/// Phase names the fallback can recommend, in chain order. Chain order
/// decides ties: when a response mentions several phases, the earliest one in
/// the lifecycle wins regardless of where it appears in the text.
const KNOWN_PHASES: &[&str] = &[
    "draft",
    "implement",
    "review-phase",
    "test-automation",
    "commit",
];

/// The status each recommended phase transitions to, mirroring the chain.
fn next_status_for(phase: &str) -> StoryStatus {
    match phase {
        "draft" => StoryStatus::ReadyForDev,
        "implement" => StoryStatus::Review,
        _ => StoryStatus::Done,
    }
}

// ---------------------------------------------------------------------------
// Recommendation / FallbackResolver
// ---------------------------------------------------------------------------

/// A single-shot phase recommendation recovered from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub phase: String,
    pub next_status: StoryStatus,
}

/// Resolves an unrecognised story status to one phase recommendation.
///
/// Last-resort routing: consulted only when the router returns
/// [`crate::router::Route::Unknown`].
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn resolve(
        &self,
        story: &str,
        status: &StoryStatus,
        cancel: &CancellationToken,
    ) -> Result<Recommendation>;
}

// ---------------------------------------------------------------------------
// HelpFallback
// ---------------------------------------------------------------------------

/// Production resolver: asks the agent itself via its help command and scans
/// the free-text answer for a known phase name.
pub struct HelpFallback {
    executor: Arc<dyn AgentExecutor>,
}

impl HelpFallback {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl FallbackResolver for HelpFallback {
    async fn resolve(
        &self,
        story: &str,
        status: &StoryStatus,
        cancel: &CancellationToken,
    ) -> Result<Recommendation> {
        let prompt = format!(
            "/help The story {story} has status \"{status}\" which is not a standard status. \
             What is the next phase to run? Respond with the phase name \
             (draft, implement, review-phase, test-automation, or commit)."
        );

        let mut response = String::new();
        let exit_code = {
            let mut handler = |event: &claude_driver::AgentEvent| {
                if let Some(text) = event.as_text() {
                    response.push_str(text);
                }
            };
            self.executor
                .execute(&prompt, None, &mut handler, cancel)
                .await?
        };

        if exit_code != 0 {
            return Err(StoryloopError::FallbackExit(exit_code));
        }

        parse_recommendation(&response)
    }
}

/// Scan a help response for the first known phase name, case-insensitively
/// and in chain order.
pub fn parse_recommendation(response: &str) -> Result<Recommendation> {
    let lowered = response.to_lowercase();
    KNOWN_PHASES
        .iter()
        .find(|phase| lowered.contains(**phase))
        .map(|phase| Recommendation {
            phase: (*phase).to_owned(),
            next_status: next_status_for(phase),
        })
        .ok_or(StoryloopError::FallbackUnparseable)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
