//! Build orchestration.
//!
//! Units stream in from the walker; each one gets its own task that runs
//! the enabled stages (test, build, hash) against the Go toolchain.
//!
//! ## Pipeline
//!
//! ```text
//! ProjectWalker --(sync_channel, capacity 5)--> Orchestrator
//!                                                 |- unit task: test -> build(targets) -> hash(targets)
//!                                                 |- unit task: ...
//! ```

mod env;
mod hasher;
mod logs;
mod orchestrator;
mod outcome;
mod runner;
mod stage;
mod target;

pub use env::{RunEnvironment, parse_env_file};
pub use hasher::{ArtifactDigest, ArtifactHasher, DigestAlgorithm, sidecar_path};
pub use logs::persist_logs;
pub use orchestrator::{BuildSettings, Orchestrator};
pub use outcome::{BuildSummary, StageError, StageOutcome, UnitReport};
pub use runner::{CapturedOutput, CommandRunner, Invocation, ProcessRunner};
pub use stage::{Stage, StageSet};
pub use target::{BuildTarget, expand_targets, exe_suffix};

use crate::ui::Reporter;
use crate::walker::ProjectWalker;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

/// Units the walker may publish ahead of the orchestrator before it blocks.
pub const UNIT_QUEUE_CAPACITY: usize = 5;

/// Discovers units under `root` and builds them as they are found.
///
/// Discovery runs on its own thread and overlaps with building. A walker
/// that refuses to start is reported after the (then empty) build drains.
pub fn run_pipeline<R: CommandRunner>(
    root: &Path,
    output_dir: &Path,
    orchestrator: &Orchestrator<'_, R>,
    reporter: &dyn Reporter,
) -> Result<BuildSummary> {
    let (tx, rx) = mpsc::sync_channel(UNIT_QUEUE_CAPACITY);
    let walker = ProjectWalker::new(root, output_dir, tx, reporter);

    thread::scope(|s| {
        let producer = s.spawn(move || walker.run());
        let summary = orchestrator.build(rx);

        match producer.join() {
            Ok(Ok(published)) => {
                reporter.info(&format!("Discovered {} app(s)", published));
                Ok(summary)
            }
            Ok(Err(e)) => Err(e).context("Error running project walker"),
            Err(_) => Err(anyhow!("Project walker panicked")),
        }
    })
}
