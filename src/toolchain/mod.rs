//! Go toolchain management
//!
//! The toolchain lives in a project-local directory (default
//! `<project>/.toolchain`) so builds never depend on whatever Go happens to
//! be on PATH:
//!
//! ```text
//! .toolchain/
//!   go/            GOROOT, extracted release archive
//!   gopath/        GOPATH, module cache and installed tools
//!   toolchain.toml install record
//! ```

pub mod install;
pub mod packages;
pub mod version;

pub use install::ensure_installed;
pub use packages::install_tools;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const INSTALL_RECORD: &str = "toolchain.toml";

/// Layout of a project-local Go installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoToolchain {
    root: PathBuf,
}

impl GoToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn goroot(&self) -> PathBuf {
        self.root.join("go")
    }

    pub fn gopath(&self) -> PathBuf {
        self.root.join("gopath")
    }

    pub fn go_binary(&self) -> PathBuf {
        self.goroot()
            .join("bin")
            .join(format!("go{}", std::env::consts::EXE_SUFFIX))
    }

    pub fn is_installed(&self) -> bool {
        self.goroot().exists()
    }

    fn record_path(&self) -> PathBuf {
        self.root.join(INSTALL_RECORD)
    }

    /// Reads the install record, if one was written.
    pub fn record(&self) -> Option<InstallRecord> {
        let contents = fs::read_to_string(self.record_path()).ok()?;
        toml::from_str(&contents).ok()
    }

    pub fn write_record(&self, record: &InstallRecord) -> Result<()> {
        let contents = toml::to_string_pretty(record)?;
        fs::write(self.record_path(), contents).with_context(|| {
            format!(
                "Failed to write install record {}",
                self.record_path().display()
            )
        })
    }
}

/// What was installed into a toolchain directory, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub version: String,
    pub source: String,
}

/// `git` is needed by `go` to resolve module dependencies.
pub fn is_git_installed() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
