use super::hasher::{ArtifactHasher, DigestAlgorithm, sidecar_path};
use super::logs::persist_logs;
use super::outcome::{BuildSummary, StageError, StageOutcome, UnitReport};
use super::runner::{CapturedOutput, CommandRunner, Invocation};
use super::{BuildTarget, RunEnvironment, Stage, StageSet, expand_targets};
use crate::config::Profile;
use crate::project::BuildableUnit;
use crate::toolchain::GoToolchain;
use crate::ui::Reporter;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Instant;

/// What to do with every unit of a run.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub targets: Vec<BuildTarget>,
    pub stages: StageSet,
    pub digests: Vec<DigestAlgorithm>,
    /// Variables from the user's environment file, layered under the
    /// toolchain overrides.
    pub extra_env: Vec<(String, String)>,
}

impl BuildSettings {
    pub fn from_profile(profile: &Profile, extra_env: Vec<(String, String)>) -> Self {
        Self {
            targets: expand_targets(&profile.os),
            stages: profile.stages.iter().copied().collect(),
            digests: profile.hashes.clone(),
            extra_env,
        }
    }
}

/// Consumer half of the pipeline: one task per unit, stages in order inside
/// a task, targets in order inside a stage.
pub struct Orchestrator<'r, R> {
    toolchain: GoToolchain,
    targets: Vec<BuildTarget>,
    stages: StageSet,
    digests: Vec<DigestAlgorithm>,
    base_env: RunEnvironment,
    runner: R,
    reporter: &'r dyn Reporter,
}

impl<'r, R: CommandRunner> Orchestrator<'r, R> {
    pub fn new(
        toolchain: GoToolchain,
        settings: BuildSettings,
        runner: R,
        reporter: &'r dyn Reporter,
    ) -> Self {
        let base_env = RunEnvironment::for_toolchain(&toolchain, &settings.extra_env);
        Self {
            toolchain,
            targets: settings.targets,
            stages: settings.stages,
            digests: settings.digests,
            base_env,
            runner,
            reporter,
        }
    }

    pub fn base_env(&self) -> &RunEnvironment {
        &self.base_env
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Drains `units` until the sender hangs up, starting one task per unit
    /// as it arrives, and returns once every task has finished.
    pub fn build(&self, units: Receiver<BuildableUnit>) -> BuildSummary {
        let reports: Vec<UnitReport> = thread::scope(|s| {
            let tasks: Vec<_> = units
                .iter()
                .map(|unit| {
                    let name = unit.name.clone();
                    (name, s.spawn(move || self.run_unit(unit)))
                })
                .collect();

            tasks
                .into_iter()
                .filter_map(|(name, task)| match task.join() {
                    Ok(report) => Some(report),
                    Err(_) => {
                        self.reporter
                            .error(&format!("Build task for app {} panicked", name));
                        None
                    }
                })
                .collect()
        });

        BuildSummary { reports }
    }

    /// Runs the enabled stages for one unit. A failed stage marks every
    /// later enabled stage as skipped.
    pub fn run_unit(&self, unit: BuildableUnit) -> UnitReport {
        let mut report = UnitReport::new(&unit.name);
        let mut failed = false;

        for stage in self.stages.iter() {
            if failed {
                report.record(stage, StageOutcome::Skipped);
                continue;
            }

            let started = Instant::now();
            let result = match stage {
                Stage::Test => self.test(&unit),
                Stage::Build => self.compile(&unit),
                Stage::Hash => {
                    self.checksum(&unit);
                    Ok(())
                }
            };

            match result {
                Ok(()) => report.record(
                    stage,
                    StageOutcome::Passed {
                        elapsed: started.elapsed(),
                    },
                ),
                Err(err) => {
                    self.reporter.error(&format!(
                        "Error in {} stage of app {}: {}",
                        stage, unit.name, err
                    ));
                    report.record(stage, StageOutcome::Failed(err));
                    failed = true;
                }
            }
        }

        report
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<CapturedOutput, StageError> {
        self.runner
            .run(invocation)
            .map_err(|source| StageError::Spawn {
                program: invocation.display(),
                source,
            })
    }

    /// `go test -v -coverprofile=<out>/coverage-<unit>.txt ./...` in the
    /// module root.
    fn test(&self, unit: &BuildableUnit) -> Result<(), StageError> {
        let started = Instant::now();
        self.reporter.step(&format!("Testing app {}", unit.name));

        let mut coverage = OsString::from("-coverprofile=");
        coverage.push(unit.coverage_path());

        let invocation = Invocation::new(
            &self.toolchain.go_binary(),
            &unit.module_root,
            &self.base_env,
        )
        .arg("test")
        .arg("-v")
        .arg(coverage)
        .arg("./...");

        let output = self.execute(&invocation)?;
        if !output.success {
            let logs = persist_logs(unit, &output, self.reporter);
            return Err(StageError::TestsFailed {
                unit: unit.name.clone(),
                status: output.status_line(),
                logs,
            });
        }

        self.reporter.success(&format!(
            "Successfully tested application `{}` in {:.1} seconds",
            unit.name,
            started.elapsed().as_secs_f64()
        ));
        Ok(())
    }

    /// `go build -o <artifact> <main dir>` once per target; the first
    /// failing target ends the stage.
    fn compile(&self, unit: &BuildableUnit) -> Result<(), StageError> {
        let go = self.toolchain.go_binary();

        for target in &self.targets {
            let started = Instant::now();
            let artifact = unit.artifact_path(target);
            self.reporter.step(&format!(
                "Building app {}{} ({}) to {}",
                unit.name,
                target.exe_suffix,
                target,
                unit.output_dir.display()
            ));

            let env = self.base_env.for_target(target);
            let invocation = Invocation::new(&go, &unit.module_root, &env)
                .arg("build")
                .arg("-o")
                .arg(&artifact)
                .arg(&unit.main_dir);

            let output = self.execute(&invocation)?;
            if !output.success {
                return Err(StageError::BuildFailed {
                    platform: target.platform.clone(),
                    arch: target.arch.clone(),
                    status: output.status_line(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }

            self.reporter.success(&format!(
                "Successfully built app `{}` for architecture {} in {:.1} seconds, output: {}",
                unit.name,
                target,
                started.elapsed().as_secs_f64(),
                artifact.display()
            ));
        }

        Ok(())
    }

    /// Writes one sidecar per (target, algorithm). Missing artifacts and
    /// failed writes are reported and skipped.
    fn checksum(&self, unit: &BuildableUnit) {
        let mut hasher = ArtifactHasher::new(&self.digests);
        let expected = self.targets.len() * hasher.algorithms().count();
        let mut written = 0;

        for target in &self.targets {
            let artifact = unit.artifact_path(target);
            let contents = match fs::read(&artifact) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.reporter.error(&format!(
                        "Application build in `{}` does not exist! Failed to generate digests",
                        artifact.display()
                    ));
                    continue;
                }
                Err(e) => {
                    self.reporter.error(&format!(
                        "Cannot open build from `{}`: {}! Failed to generate digests",
                        artifact.display(),
                        e
                    ));
                    continue;
                }
            };

            let started = Instant::now();
            self.reporter.step(&format!(
                "Generating digests for app {} ({})",
                unit.name, target
            ));

            for digest in hasher.digest(&contents) {
                let sidecar = sidecar_path(&artifact, digest.algorithm);
                if let Err(e) = fs::write(&sidecar, &digest.hex) {
                    self.reporter.error(&format!(
                        "Cannot write {} sum file in `{}`: {}",
                        digest.algorithm.label().to_uppercase(),
                        sidecar.display(),
                        e
                    ));
                    continue;
                }
                written += 1;
                self.reporter.success(&format!(
                    "Generated {} {} for app `{}` ({}) in {:.1} seconds, output: {}",
                    digest.algorithm.label().to_uppercase(),
                    digest.hex,
                    unit.name,
                    target,
                    started.elapsed().as_secs_f64(),
                    sidecar.display()
                ));
            }
        }

        self.reporter.info(&format!(
            "Wrote {} of {} digest file(s) for app {}",
            written, expected, unit.name
        ));
    }
}
