use super::RunEnvironment;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A single external tool call: program, arguments, working directory and
/// the complete environment it sees.
#[derive(Debug, Clone)]
pub struct Invocation<'e> {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: &'e RunEnvironment,
}

impl<'e> Invocation<'e> {
    pub fn new(program: &Path, cwd: &Path, env: &'e RunEnvironment) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Human readable command line for log messages.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Everything a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn status_line(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external tools on behalf of the orchestrator.
///
/// `Err` means the process could not be started at all; a process that ran
/// and failed comes back as `Ok` with `success == false`.
pub trait CommandRunner: Sync {
    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CapturedOutput>;
}

/// Spawns real processes and waits for them, capturing both streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CapturedOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .env_clear()
            .envs(invocation.env.iter())
            .output()?;

        Ok(CapturedOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
