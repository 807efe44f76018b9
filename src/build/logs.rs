use super::CapturedOutput;
use crate::project::BuildableUnit;
use crate::ui::Reporter;
use std::fs;
use std::path::PathBuf;

/// Writes the captured streams of a failed run to `build-<unit>.log`
/// (stdout) and `error-<unit>.log` (stderr) in the output directory.
///
/// Write failures are reported and skipped; the paths actually written are
/// returned.
pub fn persist_logs(
    unit: &BuildableUnit,
    output: &CapturedOutput,
    reporter: &dyn Reporter,
) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for (path, contents) in [
        (unit.stdout_log_path(), &output.stdout),
        (unit.stderr_log_path(), &output.stderr),
    ] {
        if let Err(e) = fs::write(&path, contents) {
            reporter.error(&format!(
                "Error writing log {} for app {}: {}",
                path.display(),
                unit.name,
                e
            ));
            continue;
        }
        reporter.error(&format!(
            "Error building app {}! Log stored in {}",
            unit.name,
            path.display()
        ));
        written.push(path);
    }

    written
}
