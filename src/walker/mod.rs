//! Project discovery.
//!
//! The walker traverses a source tree, finds every `main.go`, pairs it with
//! its nearest `go.mod` and publishes the resulting [`BuildableUnit`]s on a
//! bounded channel. It runs on its own thread while the orchestrator
//! consumes; a full channel blocks the walk until a unit is taken.

pub mod locator;

pub use locator::{MODULE_MARKER, find_module_root};

use crate::project::BuildableUnit;
use crate::ui::Reporter;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Program entry point, matched case-insensitively.
pub const ENTRY_POINT: &str = "main.go";

/// Path fragments never descended into: the toolchain cache and the
/// artifact directory.
pub const EXCLUDED_SEGMENTS: [&str; 2] = [".toolchain", ".build"];

#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("project walker not initialized: empty root path")]
    EmptyRoot,

    #[error("cannot resolve root path {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn is_excluded(path: &Path) -> bool {
    let path = path.to_string_lossy();
    EXCLUDED_SEGMENTS
        .iter()
        .any(|segment| path.contains(segment))
}

fn is_entry_point(entry: &DirEntry) -> bool {
    !entry.file_type().is_dir()
        && entry
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(ENTRY_POINT)
}

/// Lazily yields every unit under `root`, in lexical path order.
///
/// Unreadable entries are reported and skipped; entry points without an
/// enclosing module are skipped silently.
pub fn discover<'a>(
    root: &'a Path,
    output_dir: &'a Path,
    reporter: &'a dyn Reporter,
) -> impl Iterator<Item = BuildableUnit> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry.path()))
        .filter_map(move |entry| visit(entry, output_dir, reporter))
}

fn visit(
    entry: walkdir::Result<DirEntry>,
    output_dir: &Path,
    reporter: &dyn Reporter,
) -> Option<BuildableUnit> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
            let path = err
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            reporter.error(&format!("Error accessing path {}: {}", path, err));
            return None;
        }
    };

    if !is_entry_point(&entry) {
        return None;
    }

    let main_dir = entry.path().parent()?;
    let module_root = find_module_root(main_dir)?;
    Some(BuildableUnit::new(main_dir, &module_root, output_dir))
}

/// Producer half of the pipeline.
pub struct ProjectWalker<'r> {
    root: PathBuf,
    output_dir: PathBuf,
    dest: SyncSender<BuildableUnit>,
    reporter: &'r dyn Reporter,
}

impl<'r> ProjectWalker<'r> {
    pub fn new(
        root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        dest: SyncSender<BuildableUnit>,
        reporter: &'r dyn Reporter,
    ) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
            dest,
            reporter,
        }
    }

    /// Walks the tree and publishes every unit found, returning how many
    /// were published.
    ///
    /// Consumes the walker so the sending half is dropped exactly once when
    /// traversal ends, on every path out of this function.
    pub fn run(self) -> Result<usize, WalkerError> {
        if self.root.as_os_str().is_empty() {
            return Err(WalkerError::EmptyRoot);
        }

        let root = std::path::absolute(&self.root).map_err(|source| WalkerError::Root {
            path: self.root.clone(),
            source,
        })?;
        let output_dir =
            std::path::absolute(&self.output_dir).map_err(|source| WalkerError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;
        fs::create_dir_all(&output_dir).map_err(|source| WalkerError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut published = 0;
        for unit in discover(&root, &output_dir, self.reporter) {
            if let Some(first) = seen.get(&unit.name) {
                self.reporter.warn(&format!(
                    "App name `{}` in {} is already used by {}; their artifacts share file names in {}",
                    unit.name,
                    unit.main_dir.display(),
                    first.display(),
                    output_dir.display()
                ));
            } else {
                seen.insert(unit.name.clone(), unit.main_dir.clone());
            }

            if self.dest.send(unit).is_err() {
                self.reporter
                    .warn("Build queue closed by the consumer, stopping discovery");
                break;
            }
            published += 1;
        }

        Ok(published)
    }
}
