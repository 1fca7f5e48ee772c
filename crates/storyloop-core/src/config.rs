use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment override for the config file location.
pub const CONFIG_PATH_ENV: &str = "STORYLOOP_CONFIG_PATH";

/// Environment override for the agent binary path.
pub const AGENT_PATH_ENV: &str = "STORYLOOP_CLAUDE_PATH";

// ---------------------------------------------------------------------------
// PhaseConfig
// ---------------------------------------------------------------------------

/// Prompt template and optional model for one phase.
///
/// Templates expand `{story}` to the story key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ---------------------------------------------------------------------------
// AgentConfig / SprintConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Path to the agent binary. `STORYLOOP_CLAUDE_PATH` overrides it.
    #[serde(default = "default_binary_path")]
    pub binary_path: String,
}

fn default_binary_path() -> String {
    "claude".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SprintConfig {
    /// Explicit sprint-status path; auto-discovery applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_phases")]
    pub phases: HashMap<String, PhaseConfig>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sprint: SprintConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phases: default_phases(),
            agent: AgentConfig::default(),
            sprint: SprintConfig::default(),
        }
    }
}

fn default_phases() -> HashMap<String, PhaseConfig> {
    let mut phases = HashMap::new();
    phases.insert(
        "draft".to_string(),
        PhaseConfig {
            prompt: "/draft - Draft story: {story}. Do not ask questions.".to_string(),
            model: None,
        },
    );
    phases.insert(
        "implement".to_string(),
        PhaseConfig {
            prompt: "/implement - Work on story: {story}. Complete all tasks. Run tests after \
                     each implementation. Do not ask clarifying questions - use best judgment \
                     based on existing patterns."
                .to_string(),
            model: None,
        },
    );
    phases.insert(
        "review-phase".to_string(),
        PhaseConfig {
            prompt: "/review-phase - Review story: {story}. When presenting fix options, always \
                     choose to auto-fix all issues immediately. Do not wait for user input."
                .to_string(),
            model: None,
        },
    );
    phases.insert(
        "test-automation".to_string(),
        PhaseConfig {
            prompt: "/test-automation - Add automated test coverage for story: {story}. Run the \
                     suite and fix failures. Do not ask questions."
                .to_string(),
            model: None,
        },
    );
    phases.insert(
        "commit".to_string(),
        PhaseConfig {
            prompt: "Commit all changes for story {story} with a descriptive commit message \
                     following conventional commits format. Then push to the current branch. \
                     Do not ask questions."
                .to_string(),
            model: None,
        },
    );
    phases
}

impl Config {
    /// Load config for a project root.
    ///
    /// Reads `STORYLOOP_CONFIG_PATH` if set, else `.storyloop/config.yaml`
    /// under `root`. A missing file yields the built-in defaults; a present
    /// but unreadable or invalid file is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(env_path) if !env_path.is_empty() => std::path::PathBuf::from(env_path),
            _ => paths::config_path(root),
        };

        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseConfig> {
        self.phases.get(name)
    }

    /// The agent binary to invoke, honouring the env override.
    pub fn agent_binary(&self) -> String {
        match std::env::var(AGENT_PATH_ENV) {
            Ok(path) if !path.is_empty() => path,
            _ => self.agent.binary_path.clone(),
        }
    }
}

/// Expand a phase prompt template for a story key.
pub fn render_prompt(template: &str, story: &str) -> String {
    template.replace("{story}", story)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
