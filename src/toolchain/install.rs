//! Go toolchain installation.
//!
//! Downloads an official release archive from go.dev for the host platform
//! and unpacks it into the toolchain root. Archives contain a top-level
//! `go/` directory, which becomes GOROOT.

use super::version;
use super::{GoToolchain, InstallRecord};
use crate::ui::Reporter;
use anyhow::{Context, Result, anyhow, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const DOWNLOAD_BASE: &str = "https://go.dev/dl";

/// Maps a Rust `(os, arch)` pair to Go's `(GOOS, GOARCH)` names.
pub fn go_platform(os: &str, arch: &str) -> Option<(&'static str, &'static str)> {
    let goos = match os {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        "freebsd" => "freebsd",
        _ => return None,
    };
    let goarch = match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        _ => return None,
    };
    Some((goos, goarch))
}

pub fn host_platform() -> Option<(&'static str, &'static str)> {
    go_platform(std::env::consts::OS, std::env::consts::ARCH)
}

/// `go1.22.3.linux-amd64.tar.gz`, or `.zip` for Windows.
pub fn archive_name(version: &str, goos: &str, goarch: &str) -> String {
    let ext = if goos == "windows" { "zip" } else { "tar.gz" };
    format!("go{}.{}-{}.{}", version, goos, goarch, ext)
}

/// Makes sure the toolchain has a Go installation.
///
/// `requested` is the configured version (`latest` or a release number).
/// An existing installation is always kept; a pinned version that differs
/// from the install record only produces a warning.
pub fn ensure_installed(tc: &GoToolchain, requested: &str, reporter: &dyn Reporter) -> Result<()> {
    if tc.is_installed() {
        reporter.success("Go is already installed");
        check_pinned_version(tc, requested, reporter);
        return Ok(());
    }

    reporter.step("Go is not installed. Installing...");

    let version = version::resolve(requested).context("Error fetching latest Go version")?;
    let (goos, goarch) =
        host_platform().ok_or_else(|| anyhow!("Unsupported host platform for Go downloads"))?;

    fs::create_dir_all(tc.root()).with_context(|| {
        format!("Failed to create toolchain directory {}", tc.root().display())
    })?;

    let archive = archive_name(&version, goos, goarch);
    let url = format!("{}/{}", DOWNLOAD_BASE, archive);
    let archive_path = tc.root().join(&archive);

    reporter.info(&format!("Downloading {}", url));
    let label = format!("go{} {}/{}", version, goos, goarch);
    download_file(&url, &archive_path, &label).context("Error downloading Go archive")?;

    let extracted = extract_archive(&archive_path, tc.root());
    // Archive is removed whether extraction worked or not
    let _ = fs::remove_file(&archive_path);
    let files = extracted.context("Error extracting Go archive")?;
    reporter.info(&format!("Extracted {} files into {}", files, tc.root().display()));

    if !tc.go_binary().exists() {
        bail!(
            "Go archive did not contain {}",
            tc.go_binary().display()
        );
    }

    tc.write_record(&InstallRecord {
        version: version.clone(),
        source: url,
    })?;

    reporter.success(&format!("Go {} installed successfully!", version));
    Ok(())
}

fn check_pinned_version(tc: &GoToolchain, requested: &str, reporter: &dyn Reporter) {
    let requested = requested.trim();
    if requested.is_empty() || requested.eq_ignore_ascii_case(version::LATEST) {
        return;
    }
    let wanted = requested.trim_start_matches("go");
    if let Some(record) = tc.record()
        && record.version != wanted
    {
        reporter.warn(&format!(
            "Installed Go {} differs from configured {}. Remove {} to reinstall",
            record.version,
            wanted,
            tc.goroot().display()
        ));
    }
}

/// Streams `url` into `path`, showing `label` next to the progress bar.
fn download_file(url: &str, path: &Path, label: &str) -> Result<()> {
    let response = ureq::get(url)
        .header("User-Agent", "autobuild")
        .call()
        .map_err(|e| anyhow!("Download of {} failed: {}", label, e))?;

    let total_size = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let pb = match total_size {
        Some(size) => ProgressBar::new(size),
        None => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.blue} {msg} [{bar:40.green/black}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("◐◓◑◒")
            .progress_chars("━━╸"),
    );
    pb.set_message(label.to_string());

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut reader = pb.wrap_read(response.into_body().into_reader());
    let bytes = std::io::copy(&mut reader, &mut file)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.flush()?;

    pb.finish_with_message(format!("{} ({} bytes)", label, bytes));
    Ok(())
}

/// Unpacks a release archive into `target_dir`; returns the number of
/// regular files written.
fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    let name = archive_path.to_string_lossy();
    if name.ends_with(".zip") {
        extract_zip(archive_path, target_dir)
    } else if name.ends_with(".tar.gz") {
        extract_tar_gz(archive_path, target_dir)
    } else {
        bail!("Unknown archive format: {}", archive_path.display())
    }
}

pub(crate) fn extract_tar_gz(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    archive.set_preserve_permissions(true);

    let mut files = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();
        // unpack_in refuses entries escaping target_dir
        if !entry.unpack_in(target_dir)? {
            let path = entry.path()?.display().to_string();
            bail!("Illegal file path in Go archive: {}", path);
        }
        if is_file {
            files += 1;
        }
    }
    Ok(files)
}

/// Windows releases ship as zip. Entries whose names would land outside
/// `target_dir` fail the whole extraction.
pub(crate) fn extract_zip(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut files = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            bail!("Illegal file path in Go archive: {}", entry.name());
        };
        let dest: PathBuf = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        std::io::copy(&mut entry, &mut out)?;
        files += 1;
    }
    Ok(files)
}
