//! `autobuild.yaml` parsing and profile selection.
//!
//! ```yaml
//! profiles:
//!   default:
//!     os:
//!       linux: [amd64, arm64]
//!       windows: [amd64]
//!     stages: [test, build, hash]
//!     hashes: [sha256]
//! toolchain:
//!   golang: latest
//!   location: $HOME/.cache/autobuild/.toolchain
//!   tools:
//!     staticcheck: honnef.co/go/tools/cmd/staticcheck@latest
//! ```

use crate::build::{DigestAlgorithm, Stage, parse_env_file};
use crate::ui::Reporter;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "autobuild.yaml";
pub const DEFAULT_PROFILE: &str = "default";
pub const ENV_FILE: &str = ".go-env";
pub const TOOLCHAIN_DIR: &str = ".toolchain";

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AutobuildConfig {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// Which targets to build, which stages to run and which digests to write.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Profile {
    /// Platform -> architectures. Ordered so the target matrix is stable.
    pub os: BTreeMap<String, Vec<String>>,
    pub stages: Vec<Stage>,
    pub hashes: Vec<DigestAlgorithm>,
}

impl Default for Profile {
    fn default() -> Self {
        let archs = || vec!["amd64".to_string(), "arm64".to_string()];
        Self {
            os: ["windows", "linux", "darwin"]
                .into_iter()
                .map(|p| (p.to_string(), archs()))
                .collect(),
            stages: Stage::ALL.to_vec(),
            hashes: DigestAlgorithm::ALL.to_vec(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    #[serde(default = "default_golang")]
    pub golang: String,
    pub location: Option<String>,
    /// Binary name -> `go install` package spec.
    #[serde(default)]
    pub tools: BTreeMap<String, String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            golang: default_golang(),
            location: None,
            tools: BTreeMap::new(),
        }
    }
}

fn default_golang() -> String {
    "latest".to_string()
}

/// Result of profile selection, ready for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedConfig {
    pub profile_name: String,
    pub profile: Profile,
    pub toolchain: ToolchainConfig,
    /// Resolved toolchain directory.
    pub toolchain_root: PathBuf,
}

pub fn default_config(project: &Path) -> SelectedConfig {
    SelectedConfig {
        profile_name: DEFAULT_PROFILE.to_string(),
        profile: Profile::default(),
        toolchain: ToolchainConfig::default(),
        toolchain_root: project.join(TOOLCHAIN_DIR),
    }
}

/// Replaces every `$HOME` with the user's home directory.
pub fn expand_home(location: &str) -> String {
    match dirs::home_dir() {
        Some(home) if location.contains("$HOME") => {
            location.replace("$HOME", &home.to_string_lossy())
        }
        _ => location.to_string(),
    }
}

fn toolchain_root(project: &Path, toolchain: &ToolchainConfig) -> PathBuf {
    match toolchain.location.as_deref().map(str::trim) {
        Some(location) if !location.is_empty() => project.join(expand_home(location)),
        _ => project.join(TOOLCHAIN_DIR),
    }
}

/// Loads `autobuild.yaml` from `project` and selects `profile_name`.
///
/// A missing or broken file falls back to the default configuration with a
/// warning. A profile the file does not define is an error.
pub fn load_profile_config(
    project: &Path,
    profile_name: &str,
    reporter: &dyn Reporter,
) -> Result<SelectedConfig> {
    let path = project.join(CONFIG_FILE);
    if !path.exists() {
        reporter.warn(&format!(
            "No {} in `{}` directory. Using default",
            CONFIG_FILE,
            project.display()
        ));
        return Ok(default_config(project));
    }

    let parsed = fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|s| serde_yaml::from_str::<AutobuildConfig>(&s).map_err(anyhow::Error::from));
    let config = match parsed {
        Ok(config) => config,
        Err(e) => {
            reporter.warn(&format!(
                "Cannot load configuration from `{}` in `{}` directory: {}. Using default",
                CONFIG_FILE,
                project.display(),
                e
            ));
            return Ok(default_config(project));
        }
    };

    let Some(profile) = config.profiles.get(profile_name) else {
        let available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
        bail!(
            "There is no profile named `{}` in `{}` at `{}`. Available profiles: {}",
            profile_name,
            CONFIG_FILE,
            project.display(),
            available.join(" ")
        );
    };

    reporter.success(&format!("Profile selected: {}", profile_name));
    Ok(SelectedConfig {
        profile_name: profile_name.to_string(),
        profile: profile.clone(),
        toolchain_root: toolchain_root(project, &config.toolchain),
        toolchain: config.toolchain,
    })
}

/// `~/.go-env`
pub fn default_env_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(ENV_FILE))
}

/// Reads extra `KEY=VALUE` variables. A missing file yields nothing.
pub fn load_env_file(path: &Path, reporter: &dyn Reporter) -> Vec<(String, String)> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let vars = parse_env_file(&contents);
            if !vars.is_empty() {
                reporter.info(&format!(
                    "Loaded {} variable(s) from {}",
                    vars.len(),
                    path.display()
                ));
            }
            vars
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            reporter.warn(&format!("Cannot read {}: {}", path.display(), e));
            Vec::new()
        }
    }
}
