//! # autobuild CLI Entry Point
//!
//! Runs the whole sequence: environment check, configuration, toolchain,
//! then the discovery and build pipeline over the given tree.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

use autobuild::build::{self, BuildSettings, Orchestrator, ProcessRunner, RunEnvironment};
use autobuild::config;
use autobuild::toolchain::{self, GoToolchain};
use autobuild::ui::{self, ConsoleReporter, Reporter};

/// Output directory for artifacts, logs and digests, relative to the tree.
const OUTPUT_DIR: &str = ".build";

#[derive(Parser)]
#[command(name = "autobuild")]
#[command(about = "Test, cross-compile and checksum every Go program in a tree", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Profile from autobuild.yaml
    #[arg(long, default_value = config::DEFAULT_PROFILE)]
    profile: String,

    /// Source tree to build [default: current directory]
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let reporter = ConsoleReporter;

    ui::print_banner();

    let project = match cli.path {
        Some(path) => path,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };
    let project = std::path::absolute(&project)
        .with_context(|| format!("Cannot resolve {}", project.display()))?;

    ui::horizontal_line("Environment check");
    if !toolchain::is_git_installed() {
        bail!("git is not installed or not on PATH");
    }
    reporter.success("git is available");

    let selected = config::load_profile_config(&project, &cli.profile, &reporter)?;
    let tc = GoToolchain::new(&selected.toolchain_root);
    toolchain::ensure_installed(&tc, &selected.toolchain.golang, &reporter)?;

    let extra_env = config::default_env_file()
        .map(|path| config::load_env_file(&path, &reporter))
        .unwrap_or_default();

    let runner = ProcessRunner;
    if !selected.toolchain.tools.is_empty() {
        let env = RunEnvironment::for_toolchain(&tc, &extra_env);
        toolchain::install_tools(&tc, &selected.toolchain.tools, &env, &runner, &reporter);
    }

    ui::horizontal_line("Testing & building Go projects");
    let settings = BuildSettings::from_profile(&selected.profile, extra_env);
    let orchestrator = Orchestrator::new(tc, settings, runner, &reporter);
    let summary = build::run_pipeline(
        &project,
        &project.join(OUTPUT_DIR),
        &orchestrator,
        &reporter,
    )?;

    summary.print_table();
    ui::horizontal_line("Done!");
    Ok(())
}
