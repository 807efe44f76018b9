use std::path::{Path, PathBuf};

/// File that marks a Go module root.
pub const MODULE_MARKER: &str = "go.mod";

/// Walks upward from `start` and returns the first directory holding
/// [`MODULE_MARKER`], or `None` once the filesystem root has been checked.
pub fn find_module_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MODULE_MARKER).exists())
        .map(Path::to_path_buf)
}
