use serde::Deserialize;
use std::collections::BTreeSet;

/// One phase of the per-unit pipeline. Declaration order is run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Test,
    Build,
    Hash,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Test, Stage::Build, Stage::Hash];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Test => "test",
            Stage::Build => "build",
            Stage::Hash => "hash",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stages enabled for a run. Iteration always yields test, build, hash
/// order no matter how the set was written down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSet(BTreeSet<Stage>);

impl StageSet {
    pub fn all() -> Self {
        Stage::ALL.into_iter().collect()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = Stage> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Stage> for StageSet {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
