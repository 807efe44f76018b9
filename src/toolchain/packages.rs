//! Go tool installation into the toolchain's GOPATH.

use super::GoToolchain;
use crate::build::{CommandRunner, Invocation, RunEnvironment};
use crate::ui::Reporter;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Where `go install` puts the binary named `name`.
pub fn tool_binary(tc: &GoToolchain, name: &str) -> PathBuf {
    tc.gopath()
        .join("bin")
        .join(format!("{}{}", name, env::consts::EXE_SUFFIX))
}

/// Installs every tool in `tools` (binary name -> `package@version`) that is
/// not already present. Failures are reported per tool and never abort the
/// run. Returns how many tools are available afterwards.
pub fn install_tools(
    tc: &GoToolchain,
    tools: &BTreeMap<String, String>,
    base_env: &RunEnvironment,
    runner: &dyn CommandRunner,
    reporter: &dyn Reporter,
) -> usize {
    if tools.is_empty() {
        return 0;
    }

    let mut env = base_env.clone();
    let current = env.get("PATH").map(|p| p.to_os_string()).unwrap_or_default();
    let paths = std::iter::once(tc.gopath().join("bin")).chain(env::split_paths(&current));
    if let Ok(joined) = env::join_paths(paths) {
        env.set("PATH", joined);
    }

    let go = tc.go_binary();
    let mut ready = 0;
    for (name, package) in tools {
        if tool_binary(tc, name).exists() {
            reporter.success(&format!("Package {} [ok]", name));
            ready += 1;
            continue;
        }

        let invocation = Invocation::new(&go, tc.root(), &env)
            .arg("install")
            .arg(package);
        match runner.run(&invocation) {
            Ok(output) if output.success => {
                reporter.success(&format!("Package {} [ok]", name));
                ready += 1;
            }
            Ok(output) => reporter.error(&format!(
                "Package {} [fail]: {}\n{}",
                name,
                output.status_line(),
                String::from_utf8_lossy(&output.stderr).trim_end()
            )),
            Err(e) => reporter.error(&format!("Package {} [fail]: {}", name, e)),
        }
    }
    ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::CapturedOutput;
    use crate::ui::{BufferedReporter, Level};
    use std::fs;
    use std::io;
    use std::sync::Mutex;

    struct FakeGo {
        calls: Mutex<Vec<Vec<String>>>,
        failing: &'static str,
    }

    impl CommandRunner for FakeGo {
        fn run(&self, invocation: &Invocation<'_>) -> io::Result<CapturedOutput> {
            let args: Vec<String> = invocation
                .args
                .iter()
                .map(|a| a.to_string_lossy().to_string())
                .collect();
            let ok = !args.iter().any(|a| a.contains(self.failing));
            let path = invocation
                .env
                .get("PATH")
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut recorded = args;
            recorded.push(path);
            self.calls.lock().unwrap().push(recorded);
            Ok(CapturedOutput {
                success: ok,
                code: Some(if ok { 0 } else { 1 }),
                stdout: Vec::new(),
                stderr: b"cannot find module".to_vec(),
            })
        }
    }

    #[test]
    fn test_installs_missing_tools_only() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = GoToolchain::new(tmp.path());
        let present = tool_binary(&tc, "golint");
        fs::create_dir_all(present.parent().unwrap()).unwrap();
        fs::write(&present, b"").unwrap();

        let tools: BTreeMap<String, String> = [
            ("golint", "golang.org/x/lint/golint@latest"),
            ("staticcheck", "honnef.co/go/tools/cmd/staticcheck@latest"),
            ("broken", "example.com/broken@v0.0.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let runner = FakeGo {
            calls: Mutex::new(Vec::new()),
            failing: "broken",
        };
        let reporter = BufferedReporter::new();
        let ready = install_tools(&tc, &tools, &RunEnvironment::new(), &runner, &reporter);

        assert_eq!(ready, 2);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][..2], ["install", "example.com/broken@v0.0.0"]);
        assert_eq!(
            calls[1][..2],
            ["install", "honnef.co/go/tools/cmd/staticcheck@latest"]
        );
        let gopath_bin = tc.gopath().join("bin").display().to_string();
        assert!(calls[1][2].starts_with(&gopath_bin));

        let errors = reporter.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("broken"));
    }

    #[test]
    fn test_no_tools_configured() {
        let tc = GoToolchain::new("/nonexistent");
        let runner = FakeGo {
            calls: Mutex::new(Vec::new()),
            failing: "",
        };
        let reporter = BufferedReporter::new();
        assert_eq!(
            install_tools(&tc, &BTreeMap::new(), &RunEnvironment::new(), &runner, &reporter),
            0
        );
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
