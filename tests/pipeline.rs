//! End-to-end pipeline tests
//!
//! These tests run discovery and orchestration together over a real source
//! tree in a temp directory. The Go toolchain is replaced by a scripted
//! runner, or on Unix by a shell script standing in for `go`.

use autobuild::build::{
    self, BuildSettings, CapturedOutput, CommandRunner, DigestAlgorithm, Invocation, Orchestrator,
    ProcessRunner, Stage, StageOutcome, expand_targets, sidecar_path,
};
use autobuild::project::BuildableUnit;
use autobuild::toolchain::GoToolchain;
use autobuild::ui::{BufferedReporter, Level};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn touch(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// `tree/go.mod`, `tree/app1/{go.mod,main.go}`, `tree/lib/app2/main.go`
fn create_tree(root: &Path) -> PathBuf {
    let tree = root.join("tree");
    touch(&tree.join("go.mod"), "module tree\n");
    touch(&tree.join("app1/go.mod"), "module app1\n");
    touch(&tree.join("app1/main.go"), "package main\n");
    touch(&tree.join("lib/app2/main.go"), "package main\n");
    tree
}

fn settings(stages: &[Stage], os: &[(&str, &[&str])], digests: &[DigestAlgorithm]) -> BuildSettings {
    let os: BTreeMap<String, Vec<String>> = os
        .iter()
        .map(|(p, a)| (p.to_string(), a.iter().map(|a| a.to_string()).collect()))
        .collect();
    BuildSettings {
        targets: expand_targets(&os),
        stages: stages.iter().copied().collect(),
        digests: digests.to_vec(),
        extra_env: vec![],
    }
}

/// Records `args` plus the working directory, and writes an artifact for
/// every `go build -o <artifact>` call.
#[derive(Default)]
struct RecordingGo {
    calls: Mutex<Vec<(Vec<String>, PathBuf)>>,
}

impl CommandRunner for RecordingGo {
    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CapturedOutput> {
        let args: Vec<String> = invocation
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        if args[0] == "build" {
            let goos = invocation.env.get("GOOS").unwrap().to_string_lossy();
            fs::write(&args[2], format!("{} binary", goos))?;
        }
        self.calls
            .lock()
            .unwrap()
            .push((args, invocation.cwd.clone()));
        Ok(CapturedOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }
}

#[test]
fn test_build_and_hash_two_units_two_targets() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = create_tree(tmp.path());
    let out = tree.join(".build");

    let reporter = BufferedReporter::new();
    let orchestrator = Orchestrator::new(
        GoToolchain::new(tree.join(".toolchain")),
        settings(
            &[Stage::Build, Stage::Hash],
            &[("linux", &["amd64"]), ("windows", &["amd64"])],
            &DigestAlgorithm::ALL,
        ),
        RecordingGo::default(),
        &reporter,
    );

    let summary = build::run_pipeline(&tree, &out, &orchestrator, &reporter).unwrap();

    assert_eq!(summary.len(), 2);
    assert!(summary.failed_units().is_empty());
    for name in ["app1", "app2"] {
        let report = summary.get(name).unwrap();
        assert!(matches!(report.outcome(Stage::Build), Some(StageOutcome::Passed { .. })));
        assert!(matches!(report.outcome(Stage::Hash), Some(StageOutcome::Passed { .. })));
        assert!(report.outcome(Stage::Test).is_none());
    }

    let artifacts = [
        "app1-linux-amd64",
        "app1-windows-amd64.exe",
        "app2-linux-amd64",
        "app2-windows-amd64.exe",
    ];
    for artifact in artifacts {
        let path = out.join(artifact);
        assert!(path.is_file(), "missing {}", artifact);
        for algorithm in DigestAlgorithm::ALL {
            let sidecar = sidecar_path(&path, algorithm);
            let hex = fs::read_to_string(&sidecar).unwrap();
            assert_eq!(hex.len(), algorithm.output_size() * 2);
        }
    }

    let sha256 = fs::read_to_string(out.join("app1-linux-amd64.sha256")).unwrap();
    assert_eq!(sha256, hex::encode(Sha256::digest(b"linux binary")));

    let calls = orchestrator.runner().calls.lock().unwrap();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|(args, _)| args[0] == "build"));

    // app2 has no go.mod of its own and builds from the tree's module
    let app2_dirs: Vec<&PathBuf> = calls
        .iter()
        .filter(|(args, _)| args[2].contains("app2-"))
        .map(|(_, cwd)| cwd)
        .collect();
    assert_eq!(app2_dirs.len(), 2);
    assert!(app2_dirs.iter().all(|cwd| cwd.ends_with("tree")));

    assert!(
        reporter
            .messages(Level::Info)
            .iter()
            .any(|m| m == "Discovered 2 app(s)")
    );
}

#[test]
fn test_test_only_profile_writes_no_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = create_tree(tmp.path());
    let out = tree.join(".build");

    let reporter = BufferedReporter::new();
    let orchestrator = Orchestrator::new(
        GoToolchain::new(tree.join(".toolchain")),
        settings(&[Stage::Test], &[("linux", &["amd64"])], &[DigestAlgorithm::Sha256]),
        RecordingGo::default(),
        &reporter,
    );

    let summary = build::run_pipeline(&tree, &out, &orchestrator, &reporter).unwrap();
    assert_eq!(summary.len(), 2);

    let calls = orchestrator.runner().calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    for (args, cwd) in calls.iter() {
        assert_eq!(args[0], "test");
        assert_eq!(args[3], "./...");
        assert!(cwd.ends_with("app1") || cwd.ends_with("tree"));
    }
    assert!(!out.join("app1-linux-amd64").exists());
}

#[test]
fn test_empty_tree_yields_empty_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = tmp.path().join("empty");
    fs::create_dir_all(&tree).unwrap();

    let reporter = BufferedReporter::new();
    let orchestrator = Orchestrator::new(
        GoToolchain::new(tmp.path().join("tc")),
        settings(&Stage::ALL, &[("linux", &["amd64"])], &DigestAlgorithm::ALL),
        RecordingGo::default(),
        &reporter,
    );

    let summary = build::run_pipeline(&tree, &tree.join(".build"), &orchestrator, &reporter).unwrap();
    assert!(summary.is_empty());
    assert!(tree.join(".build").is_dir());
}

#[test]
fn test_walker_startup_error_is_returned() {
    let tmp = tempfile::tempdir().unwrap();
    let reporter = BufferedReporter::new();
    let orchestrator = Orchestrator::new(
        GoToolchain::new(tmp.path().join("tc")),
        settings(&Stage::ALL, &[("linux", &["amd64"])], &DigestAlgorithm::ALL),
        RecordingGo::default(),
        &reporter,
    );

    let err = build::run_pipeline(Path::new(""), &tmp.path().join("out"), &orchestrator, &reporter)
        .unwrap_err();
    assert!(err.to_string().contains("Error running project walker"));
    assert!(orchestrator.runner().calls.lock().unwrap().is_empty());
}

#[test]
fn test_discovery_yields_units_in_path_order() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = create_tree(tmp.path());
    let reporter = BufferedReporter::new();

    let units: Vec<BuildableUnit> =
        autobuild::walker::discover(&tree, &tree.join(".build"), &reporter).collect();
    let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();

    assert_eq!(names, vec!["app1", "app2"]);
    assert_eq!(units[0].module_root, tree.join("app1"));
    assert_eq!(units[1].module_root, tree);
}

/// Drives the real process runner against a shell script posing as `go`.
#[cfg(unix)]
#[test]
fn test_process_runner_with_fake_go_binary() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let tree = create_tree(tmp.path());
    let out = tree.join(".build");
    let tc = GoToolchain::new(tmp.path().join("tc"));

    let script = r#"#!/bin/sh
case "$1" in
  test)
    echo "ok  fake/module"
    exit 0
    ;;
  build)
    if [ "$GOARCH" = "arm64" ]; then
      echo "unsupported GOARCH $GOARCH" >&2
      exit 1
    fi
    printf '%s/%s' "$GOOS" "$GOARCH" > "$3"
    exit 0
    ;;
esac
exit 2
"#;
    let go = tc.go_binary();
    touch(&go, script);
    fs::set_permissions(&go, fs::Permissions::from_mode(0o755)).unwrap();

    let reporter = BufferedReporter::new();
    let orchestrator = Orchestrator::new(
        tc,
        settings(
            &Stage::ALL,
            &[("linux", &["amd64", "arm64"])],
            &[DigestAlgorithm::Sha256],
        ),
        ProcessRunner,
        &reporter,
    );

    let summary = build::run_pipeline(&tree, &out, &orchestrator, &reporter).unwrap();

    assert_eq!(summary.failed_units(), vec!["app1", "app2"]);
    for name in ["app1", "app2"] {
        let report = summary.get(name).unwrap();
        assert!(matches!(report.outcome(Stage::Test), Some(StageOutcome::Passed { .. })));
        match report.outcome(Stage::Build) {
            Some(StageOutcome::Failed(err)) => {
                assert!(err.to_string().contains("error building for linux/arm64"));
                assert!(err.to_string().contains("unsupported GOARCH arm64"));
            }
            other => panic!("unexpected build outcome: {:?}", other),
        }
        assert!(matches!(report.outcome(Stage::Hash), Some(StageOutcome::Skipped)));

        // amd64 was built before arm64 failed; no digests were written
        let artifact = out.join(format!("{}-linux-amd64", name));
        assert_eq!(fs::read_to_string(&artifact).unwrap(), "linux/amd64");
        assert!(!sidecar_path(&artifact, DigestAlgorithm::Sha256).exists());
    }
}
