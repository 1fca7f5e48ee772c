use crate::error::{Result, StoryloopError};
use crate::io::atomic_write;
use crate::paths;
use crate::status::StoryStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment override for the sprint-status file location. Takes priority
/// over both the configured path and auto-discovery.
pub const SPRINT_PATH_ENV: &str = "STORYLOOP_SPRINT_STATUS_PATH";

// ---------------------------------------------------------------------------
// SprintDoc
// ---------------------------------------------------------------------------

/// The persisted sprint document: a `development_status` mapping of story
/// key → status, plus any other top-level sections, which are carried through
/// updates untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintDoc {
    pub development_status: BTreeMap<String, StoryStatus>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Resolve the sprint-status file location.
///
/// Priority:
///  1. `STORYLOOP_SPRINT_STATUS_PATH` environment variable, used as-is
///  2. Explicit path (e.g. from config), used as-is
///  3. Auto-discovery: the first of [`paths::SPRINT_CANDIDATES`] that exists
///     under `base`
///  4. The first candidate unchanged — errors surface at first read
pub fn resolve_path(base: &Path, explicit: Option<&str>) -> PathBuf {
    let env = std::env::var(SPRINT_PATH_ENV).ok();
    resolve_with_env(env.as_deref(), base, explicit)
}

fn resolve_with_env(env: Option<&str>, base: &Path, explicit: Option<&str>) -> PathBuf {
    if let Some(env_path) = env {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    if let Some(explicit) = explicit {
        if !explicit.is_empty() {
            return PathBuf::from(explicit);
        }
    }

    for candidate in paths::SPRINT_CANDIDATES {
        let full = base.join(candidate);
        if full.exists() {
            return full;
        }
    }

    base.join(paths::SPRINT_CANDIDATES[0])
}

// ---------------------------------------------------------------------------
// StatusAccess
// ---------------------------------------------------------------------------

/// Read/write access to story statuses — the executor's seam between the
/// file-backed store and in-memory test doubles.
pub trait StatusAccess: Send + Sync {
    fn story_status(&self, story: &str) -> Result<StoryStatus>;
    fn update_status(&self, story: &str, status: &StoryStatus) -> Result<()>;
}

// ---------------------------------------------------------------------------
// StatusStore
// ---------------------------------------------------------------------------

/// File-backed status store over the sprint document.
///
/// All mutation of the document goes through [`StatusStore::update_status`],
/// which re-persists atomically (tempfile + rename) so a crashed writer can
/// never leave a torn file behind.
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    /// Store at the resolved location for `base`, honouring the env override
    /// and an optional explicit path from config.
    pub fn new(base: &Path, explicit: Option<&str>) -> Self {
        Self {
            path: resolve_path(base, explicit),
        }
    }

    /// Store at an exact path, bypassing resolution.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and parse the full sprint document.
    pub fn read(&self) -> Result<SprintDoc> {
        let data = std::fs::read_to_string(&self.path)?;
        let doc: SprintDoc = serde_yaml::from_str(&data)?;
        Ok(doc)
    }

    fn persist(&self, doc: &SprintDoc) -> Result<()> {
        let data = serde_yaml::to_string(doc)?;
        atomic_write(&self.path, data.as_bytes())
    }

    /// All story keys belonging to an epic, sorted by story number.
    ///
    /// Keys match `{epic}-{N}-*` where `N` is numeric; the sort is numeric,
    /// so `2` precedes `10`.
    pub fn epic_stories(&self, epic: &str) -> Result<Vec<String>> {
        let doc = self.read()?;
        let prefix = format!("{epic}-");

        let mut stories: Vec<(u64, String)> = doc
            .development_status
            .keys()
            .filter_map(|key| {
                let remainder = key.strip_prefix(&prefix)?;
                let number = remainder.split('-').next()?.parse::<u64>().ok()?;
                Some((number, key.clone()))
            })
            .collect();

        if stories.is_empty() {
            return Err(StoryloopError::EpicNotFound(epic.to_owned()));
        }

        stories.sort_by_key(|(number, _)| *number);
        Ok(stories.into_iter().map(|(_, key)| key).collect())
    }
}

impl StatusAccess for StatusStore {
    fn story_status(&self, story: &str) -> Result<StoryStatus> {
        let doc = self.read()?;
        doc.development_status
            .get(story)
            .cloned()
            .ok_or_else(|| StoryloopError::StoryNotFound(story.to_owned()))
    }

    fn update_status(&self, story: &str, status: &StoryStatus) -> Result<()> {
        if !status.is_recognized() {
            return Err(StoryloopError::InvalidStatus(status.as_str().to_owned()));
        }

        let mut doc = self.read()?;
        if !doc.development_status.contains_key(story) {
            return Err(StoryloopError::StoryNotFound(story.to_owned()));
        }
        doc.development_status
            .insert(story.to_owned(), status.clone());

        self.persist(&doc)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
