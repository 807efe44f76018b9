//! Artifact digests.
//!
//! Every unit task owns its own [`ArtifactHasher`]; digest state is never
//! shared between tasks. Within one artifact the algorithms run in
//! parallel, each on its own state, and each state is reset as it is read.

use rayon::prelude::*;
use serde::Deserialize;
use sha2::digest::DynDigest;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// 20-byte digest.
    Sha1,
    /// 32-byte digest.
    Sha256,
    /// 64-byte digest.
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 3] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha512,
    ];

    /// Lowercase name, also the sidecar file extension.
    pub fn label(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn output_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    fn new_state(self) -> Box<dyn DynDigest + Send> {
        match self {
            DigestAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            DigestAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            DigestAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A digest of one artifact, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDigest {
    pub algorithm: DigestAlgorithm,
    pub hex: String,
}

/// Reusable digest states for a fixed set of algorithms.
pub struct ArtifactHasher {
    states: Vec<(DigestAlgorithm, Box<dyn DynDigest + Send>)>,
}

impl ArtifactHasher {
    /// Repeated algorithms are only computed once.
    pub fn new(algorithms: &[DigestAlgorithm]) -> Self {
        let mut states: Vec<(DigestAlgorithm, Box<dyn DynDigest + Send>)> = Vec::new();
        for &algorithm in algorithms {
            if !states.iter().any(|(a, _)| *a == algorithm) {
                states.push((algorithm, algorithm.new_state()));
            }
        }
        Self { states }
    }

    pub fn algorithms(&self) -> impl Iterator<Item = DigestAlgorithm> + '_ {
        self.states.iter().map(|(a, _)| *a)
    }

    /// Digests `bytes` with every algorithm, in construction order.
    ///
    /// States are left reset, so the next call depends only on its own
    /// input.
    pub fn digest(&mut self, bytes: &[u8]) -> Vec<ArtifactDigest> {
        self.states
            .par_iter_mut()
            .map(|(algorithm, state)| {
                state.update(bytes);
                ArtifactDigest {
                    algorithm: *algorithm,
                    hex: hex::encode(state.finalize_reset()),
                }
            })
            .collect()
    }
}

/// `<artifact>.<algorithm>`, next to the artifact.
pub fn sidecar_path(artifact: &Path, algorithm: DigestAlgorithm) -> PathBuf {
    let mut path = artifact.as_os_str().to_os_string();
    path.push(".");
    path.push(algorithm.label());
    PathBuf::from(path)
}
