use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STORYLOOP_DIR: &str = ".storyloop";

/// Canonical sprint-status location.
pub const SPRINT_FILE: &str = ".storyloop/sprint-status.yaml";
/// Pre-`.storyloop/` location at the project root.
pub const LEGACY_SPRINT_FILE: &str = "sprint-status.yaml";

pub const CONFIG_FILE: &str = ".storyloop/config.yaml";
pub const WORKFLOW_MANIFEST_FILE: &str = ".storyloop/workflow-manifest.csv";
pub const MODULES_FILE: &str = ".storyloop/modules.yaml";

/// Sprint-status candidates probed during auto-discovery, in priority order.
pub const SPRINT_CANDIDATES: &[&str] = &[SPRINT_FILE, LEGACY_SPRINT_FILE];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn workflow_manifest_path(root: &Path) -> PathBuf {
    root.join(WORKFLOW_MANIFEST_FILE)
}

pub fn modules_path(root: &Path) -> PathBuf {
    root.join(MODULES_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.storyloop/config.yaml")
        );
        assert_eq!(
            workflow_manifest_path(root),
            PathBuf::from("/tmp/proj/.storyloop/workflow-manifest.csv")
        );
        assert_eq!(
            modules_path(root),
            PathBuf::from("/tmp/proj/.storyloop/modules.yaml")
        );
    }
}
