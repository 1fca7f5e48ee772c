use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryloopError {
    #[error("story not found: {0}")]
    StoryNotFound(String),

    #[error("no stories found for epic: {0}")]
    EpicNotFound(String),

    #[error("unknown status '{status}' for story '{story}' — check the sprint status file")]
    UnknownStatus { story: String, status: String },

    #[error("unknown status '{status}': fallback resolution exceeded maximum depth ({depth})")]
    FallbackDepthExceeded { status: String, depth: u32 },

    #[error("fallback response did not contain a recognizable phase recommendation")]
    FallbackUnparseable,

    #[error("fallback query returned exit code {0}")]
    FallbackExit(i32),

    #[error("unknown status '{status}' and fallback resolution failed: {source}")]
    FallbackFailed {
        status: String,
        #[source]
        source: Box<StoryloopError>,
    },

    #[error("phase failed: {phase} returned exit code {code}")]
    PhaseFailed { phase: String, code: i32 },

    #[error("failed to record status for story '{story}' after phase '{phase}': {source}")]
    StatusUpdate {
        story: String,
        phase: String,
        #[source]
        source: Box<StoryloopError>,
    },

    /// A phase name with no prompt template configured. This is a
    /// configuration defect, distinct from a non-zero agent exit.
    #[error("no prompt configured for phase: {0}")]
    UnknownPhase(String),

    #[error("cannot persist unrecognised status: {0}")]
    InvalidStatus(String),

    #[error("workflow manifest error: {0}")]
    Manifest(String),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Agent(#[from] claude_driver::AgentError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, StoryloopError>;
