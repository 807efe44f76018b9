use std::collections::BTreeMap;

/// The one platform family whose executables carry an extension.
const WINDOWS: &str = "windows";

/// One cross-compilation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildTarget {
    /// Value handed to the compiler as `GOOS`.
    pub platform: String,
    /// Value handed to the compiler as `GOARCH`.
    pub arch: String,
    pub exe_suffix: &'static str,
}

impl BuildTarget {
    pub fn new(platform: &str, arch: &str) -> Self {
        Self {
            platform: platform.to_string(),
            arch: arch.to_string(),
            exe_suffix: exe_suffix(platform),
        }
    }

    /// File name of the artifact `unit` produces for this target.
    pub fn artifact_name(&self, unit: &str) -> String {
        format!(
            "{}-{}-{}{}",
            unit, self.platform, self.arch, self.exe_suffix
        )
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.arch)
    }
}

pub fn exe_suffix(platform: &str) -> &'static str {
    if platform == WINDOWS { ".exe" } else { "" }
}

/// Flattens `{platform -> [arch, ...]}` into the ordered target list.
///
/// Platforms come out in key order, architectures in listed order with
/// repeats dropped, so equal configurations always give equal sequences.
pub fn expand_targets(platforms: &BTreeMap<String, Vec<String>>) -> Vec<BuildTarget> {
    let mut targets = Vec::new();
    for (platform, archs) in platforms {
        for (i, arch) in archs.iter().enumerate() {
            if archs[..i].contains(arch) {
                continue;
            }
            targets.push(BuildTarget::new(platform, arch));
        }
    }
    targets
}
