use crate::build::BuildTarget;
use std::path::{Path, PathBuf};

/// One discovered program: a `main.go` paired with its nearest `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildableUnit {
    /// Base name of the directory holding `main.go`.
    pub name: String,
    /// Directory containing the entry point.
    pub main_dir: PathBuf,
    /// Nearest ancestor (or `main_dir` itself) containing `go.mod`.
    pub module_root: PathBuf,
    /// Artifact directory shared by every unit of the run.
    pub output_dir: PathBuf,
}

impl BuildableUnit {
    pub fn new(main_dir: &Path, module_root: &Path, output_dir: &Path) -> Self {
        let name = main_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());

        Self {
            name,
            main_dir: main_dir.to_path_buf(),
            module_root: module_root.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// `<output>/<unit>-<platform>-<arch><suffix>`
    pub fn artifact_path(&self, target: &BuildTarget) -> PathBuf {
        self.output_dir.join(target.artifact_name(&self.name))
    }

    pub fn coverage_path(&self) -> PathBuf {
        self.output_dir.join(format!("coverage-{}.txt", self.name))
    }

    pub fn stdout_log_path(&self) -> PathBuf {
        self.output_dir.join(format!("build-{}.log", self.name))
    }

    pub fn stderr_log_path(&self) -> PathBuf {
        self.output_dir.join(format!("error-{}.log", self.name))
    }
}
