//! Go release lookup.

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

pub const RELEASES_URL: &str = "https://go.dev/dl/?mode=json";

/// Requested version meaning "newest stable release".
pub const LATEST: &str = "latest";

#[derive(Deserialize, Debug, Clone)]
pub struct GoRelease {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

/// Extracts the number from a release tag: `go1.17.2` -> `1.17.2`.
pub fn extract_version_number(tag: &str) -> Option<String> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| Regex::new(r"go([0-9.]+)").expect("valid version pattern"));
    re.captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First stable release in the listing (the listing is newest first).
pub fn latest_stable(releases: &[GoRelease]) -> Option<String> {
    releases
        .iter()
        .find(|r| r.stable)
        .and_then(|r| extract_version_number(&r.version))
}

/// Queries go.dev for the newest stable release number.
pub fn fetch_latest_stable() -> Result<String> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(15)))
        .build()
        .into();

    let response = agent
        .get(RELEASES_URL)
        .header("User-Agent", "autobuild")
        .call()
        .context("Failed to fetch Go release list")?;

    let releases: Vec<GoRelease> = serde_json::from_reader(response.into_body().into_reader())
        .context("Failed to parse Go release list")?;

    latest_stable(&releases).ok_or_else(|| anyhow!("No stable Go version found"))
}

/// Turns a configured version (`latest`, `1.22.3`, `go1.22.3`) into a
/// concrete release number.
pub fn resolve(requested: &str) -> Result<String> {
    let requested = requested.trim();
    if requested.is_empty() || requested.eq_ignore_ascii_case(LATEST) {
        return fetch_latest_stable();
    }
    Ok(requested.trim_start_matches("go").to_string())
}
