use crate::error::{Result, StoryloopError};
use crate::manifest::WorkflowManifest;
use crate::status::StoryStatus;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One entry of the phase chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub phase: String,
    pub next_status: StoryStatus,
    /// Model hint from the workflow manifest's optional `model` column.
    /// Surfaced in dry-run plans; execution resolves its model from config.
    pub model: Option<String>,
}

/// A step handed to the lifecycle executor: which phase to run and which
/// status to persist once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStep {
    pub phase: String,
    pub next_status: StoryStatus,
    pub model: Option<String>,
}

impl From<&ChainStep> for LifecycleStep {
    fn from(step: &ChainStep) -> Self {
        Self {
            phase: step.phase.clone(),
            next_status: step.next_status.clone(),
            model: step.model.clone(),
        }
    }
}

/// Routing decision for a status. `Steps` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The story is `done`; callers should skip it rather than fail.
    Complete,
    /// The status is not in the routing table — likely a typo in the sprint
    /// file, recoverable through the fallback resolver.
    Unknown,
    /// The remaining chain suffix, in execution order.
    Steps(Vec<LifecycleStep>),
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Owns the ordered phase chain and the status → chain-index map.
///
/// Construct with [`Router::default`] for the built-in chain or
/// [`Router::from_manifest`] for manifest-driven routing; a faithful
/// manifest produces a router indistinguishable from the default.
#[derive(Debug, Clone)]
pub struct Router {
    chain: Vec<ChainStep>,
    status_index: HashMap<StoryStatus, usize>,
}

impl Default for Router {
    /// The built-in chain:
    /// draft → implement → review-phase → commit, entered at
    /// backlog:0, ready-for-dev:1, in-progress:1, review:2.
    fn default() -> Self {
        let chain = vec![
            ChainStep {
                phase: "draft".into(),
                next_status: StoryStatus::ReadyForDev,
                model: None,
            },
            ChainStep {
                phase: "implement".into(),
                next_status: StoryStatus::Review,
                model: None,
            },
            ChainStep {
                phase: "review-phase".into(),
                next_status: StoryStatus::Done,
                model: None,
            },
            ChainStep {
                phase: "commit".into(),
                next_status: StoryStatus::Done,
                model: None,
            },
        ];
        let status_index = HashMap::from([
            (StoryStatus::Backlog, 0),
            (StoryStatus::ReadyForDev, 1),
            (StoryStatus::InProgress, 1),
            (StoryStatus::Review, 2),
        ]);
        Self {
            chain,
            status_index,
        }
    }
}

impl Router {
    /// Build a router from a workflow manifest.
    ///
    /// Rows are walked in order: the first sighting of a phase appends it to
    /// the chain; every row with a non-empty `trigger_status` registers that
    /// status against the phase's chain index (last row wins when a trigger
    /// status repeats).
    pub fn from_manifest(manifest: &WorkflowManifest) -> Result<Self> {
        let mut chain: Vec<ChainStep> = Vec::new();
        let mut status_index = HashMap::new();

        for row in &manifest.rows {
            let existing = chain.iter().position(|s| s.phase == row.phase);

            let index = match existing {
                Some(index) => index,
                None => {
                    let next_status = StoryStatus::from(row.next_status.as_str());
                    if !next_status.is_recognized() {
                        return Err(StoryloopError::Manifest(format!(
                            "phase '{}' has unrecognised next_status '{}'",
                            row.phase, row.next_status
                        )));
                    }
                    chain.push(ChainStep {
                        phase: row.phase.clone(),
                        next_status,
                        model: row.model.clone(),
                    });
                    chain.len() - 1
                }
            };

            if !row.trigger_status.is_empty() {
                status_index.insert(StoryStatus::from(row.trigger_status.as_str()), index);
            }
        }

        if chain.is_empty() {
            return Err(StoryloopError::Manifest(
                "manifest contains no phases".into(),
            ));
        }

        Ok(Self {
            chain,
            status_index,
        })
    }

    /// The remaining lifecycle for a status: the chain suffix starting at the
    /// status's mapped index.
    pub fn lifecycle(&self, status: &StoryStatus) -> Route {
        if status.is_done() {
            return Route::Complete;
        }
        let Some(&start) = self.status_index.get(status) else {
            return Route::Unknown;
        };
        Route::Steps(self.chain[start..].iter().map(LifecycleStep::from).collect())
    }

    /// Like [`Router::lifecycle`] but only the first step, for callers that
    /// drive one phase at a time.
    pub fn single(&self, status: &StoryStatus) -> Route {
        match self.lifecycle(status) {
            Route::Steps(steps) => Route::Steps(steps.into_iter().take(1).collect()),
            other => other,
        }
    }

    /// Insert a phase immediately after the first occurrence of
    /// `after_phase`. Used for module plug-ins (e.g. test-automation after
    /// review-phase).
    ///
    /// No-op when `after_phase` is absent, and idempotent: a phase already in
    /// the chain is never inserted twice. Chain indices at or past the
    /// insertion point shift by one, keeping status mappings valid.
    pub fn insert_after(&mut self, after_phase: &str, phase: &str, next_status: StoryStatus) {
        if self.chain.iter().any(|s| s.phase == phase) {
            return;
        }
        let Some(position) = self.chain.iter().position(|s| s.phase == after_phase) else {
            return;
        };
        let insert_at = position + 1;

        self.chain.insert(
            insert_at,
            ChainStep {
                phase: phase.to_owned(),
                next_status,
                model: None,
            },
        );

        for index in self.status_index.values_mut() {
            if *index >= insert_at {
                *index += 1;
            }
        }
    }

    pub fn chain(&self) -> &[ChainStep] {
        &self.chain
    }

    /// The chain index a recognised status resumes at, if it has one.
    pub fn trigger_index(&self, status: &StoryStatus) -> Option<usize> {
        self.status_index.get(status).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
