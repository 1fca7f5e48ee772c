use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StoryStatus
// ---------------------------------------------------------------------------

/// Where a story sits in its lifecycle.
///
/// The recognised set is closed; anything else read from the sprint document
/// lands in `Unrecognized` with the original string preserved, so it can be
/// reported verbatim and handed to the fallback resolver. `Done` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoryStatus {
    Backlog,
    ReadyForDev,
    InProgress,
    Review,
    Done,
    Unrecognized(String),
}

impl StoryStatus {
    /// The recognised statuses, in lifecycle order.
    pub fn recognized() -> &'static [StoryStatus] {
        &[
            StoryStatus::Backlog,
            StoryStatus::ReadyForDev,
            StoryStatus::InProgress,
            StoryStatus::Review,
            StoryStatus::Done,
        ]
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, StoryStatus::Unrecognized(_))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StoryStatus::Done)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StoryStatus::Backlog => "backlog",
            StoryStatus::ReadyForDev => "ready-for-dev",
            StoryStatus::InProgress => "in-progress",
            StoryStatus::Review => "review",
            StoryStatus::Done => "done",
            StoryStatus::Unrecognized(s) => s,
        }
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StoryStatus {
    fn from(s: &str) -> Self {
        match s {
            "backlog" => StoryStatus::Backlog,
            "ready-for-dev" => StoryStatus::ReadyForDev,
            "in-progress" => StoryStatus::InProgress,
            "review" => StoryStatus::Review,
            "done" => StoryStatus::Done,
            other => StoryStatus::Unrecognized(other.to_owned()),
        }
    }
}

impl From<String> for StoryStatus {
    fn from(s: String) -> Self {
        StoryStatus::from(s.as_str())
    }
}

impl From<StoryStatus> for String {
    fn from(s: StoryStatus) -> Self {
        s.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
