use crate::error::{Result, StoryloopError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

// ---------------------------------------------------------------------------
// Workflow manifest (CSV)
// ---------------------------------------------------------------------------

/// One row of the workflow manifest.
///
/// A phase may appear on several rows with different trigger statuses; the
/// router collapses those into a single chain entry.
#[derive(Debug, Clone)]
pub struct ManifestRow {
    /// Phase name — also names the prompt template and slash command.
    pub phase: String,
    /// Story status that resumes the chain at this phase. Empty for phases
    /// that are chain-only (e.g. commit).
    pub trigger_status: String,
    /// Status persisted after the phase succeeds.
    pub next_status: String,
    /// Optional model hint from the `model` column.
    pub model: Option<String>,
    /// Any further columns, preserved but not interpreted.
    pub extra: BTreeMap<String, String>,
}

/// Parsed workflow manifest, rows in lifecycle execution order.
#[derive(Debug, Clone)]
pub struct WorkflowManifest {
    pub rows: Vec<ManifestRow>,
}

const REQUIRED_COLUMNS: &[&str] = &["phase", "trigger_status", "next_status"];

impl WorkflowManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(StoryloopError::Manifest(format!(
                    "missing required column: {required}"
                )));
            }
        }

        let column = |name: &str| headers.iter().position(|h| h == name);
        let phase_col = column("phase").expect("checked above");
        let trigger_col = column("trigger_status").expect("checked above");
        let next_col = column("next_status").expect("checked above");
        let model_col = column("model");

        let mut rows = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let field = |index: usize| record.get(index).unwrap_or("").to_owned();

            let phase = field(phase_col);
            if phase.is_empty() {
                return Err(StoryloopError::Manifest(format!(
                    "row {}: phase name is required",
                    line + 2
                )));
            }

            let known = [Some(phase_col), Some(trigger_col), Some(next_col), model_col];
            let extra = headers
                .iter()
                .enumerate()
                .filter(|(index, _)| !known.contains(&Some(*index)))
                .map(|(index, name)| (name.clone(), field(index)))
                .collect();

            rows.push(ManifestRow {
                phase,
                trigger_status: field(trigger_col),
                next_status: field(next_col),
                model: model_col.map(field).filter(|m| !m.is_empty()),
                extra,
            });
        }

        if rows.is_empty() {
            return Err(StoryloopError::Manifest(
                "manifest contains no rows".into(),
            ));
        }

        Ok(Self { rows })
    }

    /// Unique phase names in first-appearance order.
    pub fn phases(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.phase.as_str()) {
                seen.push(row.phase.as_str());
            }
        }
        seen
    }
}

// ---------------------------------------------------------------------------
// Module manifest (YAML)
// ---------------------------------------------------------------------------

/// Modules whose presence injects a `test-automation` phase after
/// `review-phase` at startup.
pub const TEST_AUTOMATION_MODULES: &[&str] = &["test-automation", "test-architect"];

/// One installed plug-in module.
#[derive(Debug, Clone, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModuleManifestFile {
    #[serde(default)]
    modules: Vec<Module>,
}

/// Installed plug-in modules, read from the module manifest YAML.
#[derive(Debug, Clone)]
pub struct ModuleManifest {
    pub modules: Vec<Module>,
}

impl ModuleManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_str(&data)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(data: &str) -> Result<Self> {
        let raw: ModuleManifestFile = serde_yaml::from_str(data)?;
        if raw.modules.is_empty() {
            return Err(StoryloopError::Manifest(
                "module manifest contains no modules".into(),
            ));
        }
        for (index, module) in raw.modules.iter().enumerate() {
            if module.name.is_empty() {
                return Err(StoryloopError::Manifest(format!(
                    "module at index {index} has no name"
                )));
            }
        }
        Ok(Self {
            modules: raw.modules,
        })
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// True when any installed module should add the test-automation phase.
    pub fn wants_test_automation(&self) -> bool {
        TEST_AUTOMATION_MODULES
            .iter()
            .any(|name| self.has_module(name))
    }

    /// Installed module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
