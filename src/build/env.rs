use super::BuildTarget;
use crate::toolchain::GoToolchain;
use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};

/// Environment handed to every toolchain process.
///
/// Built once per orchestrator; per-target copies are taken with
/// [`RunEnvironment::for_target`] and never write back into the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnvironment {
    vars: BTreeMap<OsString, OsString>,
    /// Names compare case-insensitively, as on Windows (`Path` is `PATH`).
    fold_case: bool,
}

impl Default for RunEnvironment {
    fn default() -> Self {
        Self {
            vars: BTreeMap::new(),
            fold_case: cfg!(windows),
        }
    }
}

impl RunEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    pub fn inherit() -> Self {
        Self {
            vars: env::vars_os().collect(),
            ..Self::default()
        }
    }

    /// Inherited environment, then `extra` (from `~/.go-env`), then the
    /// toolchain overrides: `GOROOT`, `GOPATH` and `PATH` with
    /// `<goroot>/bin` in front.
    pub fn for_toolchain(toolchain: &GoToolchain, extra: &[(String, String)]) -> Self {
        let mut env = Self::inherit();
        env.extend(extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        env.apply_toolchain(toolchain);
        env
    }

    pub fn apply_toolchain(&mut self, toolchain: &GoToolchain) {
        self.set("GOPATH", toolchain.gopath());
        self.set("GOROOT", toolchain.goroot());

        let current = self.get("PATH").map(OsStr::to_os_string).unwrap_or_default();
        let paths = std::iter::once(toolchain.goroot().join("bin"))
            .chain(env::split_paths(&current).filter(|p| !p.as_os_str().is_empty()));
        match env::join_paths(paths) {
            Ok(joined) => self.set("PATH", joined),
            // An entry containing the separator cannot be joined; keep PATH usable
            Err(_) => self.set("PATH", toolchain.goroot().join("bin")),
        }
    }

    /// Copy of this environment with `GOOS`/`GOARCH` set for `target`.
    pub fn for_target(&self, target: &BuildTarget) -> Self {
        let mut env = self.clone();
        env.set("GOOS", &target.platform);
        env.set("GOARCH", &target.arch);
        env
    }

    /// Stored spelling of `key`, if the variable is set.
    fn stored_key(&self, key: &OsStr) -> Option<&OsString> {
        if let Some((stored, _)) = self.vars.get_key_value(key) {
            return Some(stored);
        }
        if !self.fold_case {
            return None;
        }
        self.vars.keys().find(|stored| stored.eq_ignore_ascii_case(key))
    }

    /// Sets `key`, overwriting an existing variable under its stored
    /// spelling when names are case-insensitive.
    pub fn set(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        let key = key.as_ref();
        let stored = self
            .stored_key(key)
            .cloned()
            .unwrap_or_else(|| key.to_os_string());
        self.vars.insert(stored, value.as_ref().to_os_string());
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        let stored = self.stored_key(key.as_ref())?;
        self.vars.get(stored).map(OsString::as_os_str)
    }

    pub fn extend<K, V>(&mut self, vars: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Parses `KEY=VALUE` lines. Blank lines, `#` comments and lines without
/// `=` are ignored; the value keeps everything after the first `=`.
pub fn parse_env_file(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .collect()
}
