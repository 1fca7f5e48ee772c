use std::path::{Path, PathBuf};

/// Directory names that mark a project root, tried in order: an initialised
/// `.storyloop/` tree wins over a bare git checkout.
const ROOT_MARKERS: &[&str] = &[".storyloop", ".git"];

/// Resolve the project root directory.
///
/// An explicit root (the `--root` flag or `STORYLOOP_ROOT`) is taken as-is.
/// Otherwise the current directory and its ancestors are scanned for each
/// marker in [`ROOT_MARKERS`]; with no marker found anywhere, the current
/// directory itself is the root.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    ROOT_MARKERS
        .iter()
        .find_map(|marker| nearest_ancestor_with(&cwd, marker))
        .unwrap_or(cwd)
}

/// The closest ancestor of `start` (including `start` itself) that contains
/// a directory named `marker`.
fn nearest_ancestor_with(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
