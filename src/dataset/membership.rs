//! Split membership manifests
//!
//! `sep_testlist.txt` and `sep_trainlist.txt` list one `{major}/{minor}`
//! identifier per line. Anything in neither list is classified as `other`.

use super::layout::DatasetLayout;
use super::Split;
use crate::error::{Error, Result};
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// Test and train identifier sets, read-only after loading
#[derive(Debug, Clone, Default)]
pub struct Membership {
    test: HashSet<String>,
    train: HashSet<String>,
    test_digest: String,
    train_digest: String,
}

impl Membership {
    /// Load both manifests of a resolved dataset
    pub fn load(layout: &DatasetLayout) -> Result<Self> {
        Self::from_files(&layout.test_manifest, &layout.train_manifest)
    }

    pub fn from_files(test_path: &Path, train_path: &Path) -> Result<Self> {
        let test = read_manifest(test_path)?;
        let train = read_manifest(train_path)?;
        let membership = Self::from_lists(&test, &train);
        info!(
            "Loaded manifests: {} test, {} train identifiers",
            membership.test.len(),
            membership.train.len()
        );
        let overlap = membership.overlap();
        if overlap > 0 {
            warn!(
                "{} identifiers are listed in both {} and {}; they will be classified as test",
                overlap,
                test_path.display(),
                train_path.display()
            );
        }
        Ok(membership)
    }

    /// Build from manifest contents
    pub fn from_lists(test: &str, train: &str) -> Self {
        Self {
            test: parse_manifest(test),
            train: parse_manifest(train),
            test_digest: hex::encode(Sha256::digest(test.as_bytes())),
            train_digest: hex::encode(Sha256::digest(train.as_bytes())),
        }
    }

    pub fn classify(&self, major: &str, minor: &str) -> Split {
        self.classify_id(&format!("{major}/{minor}"))
    }

    /// Test membership is checked before train
    pub fn classify_id(&self, id: &str) -> Split {
        if self.test.contains(id) {
            Split::Test
        } else if self.train.contains(id) {
            Split::Train
        } else {
            Split::Other
        }
    }

    /// Number of identifiers present in both manifests
    pub fn overlap(&self) -> usize {
        self.test.intersection(&self.train).count()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    /// SHA-256 of the raw test manifest
    pub fn test_digest(&self) -> &str {
        &self.test_digest
    }

    /// SHA-256 of the raw train manifest
    pub fn train_digest(&self) -> &str {
        &self.train_digest
    }
}

/// One identifier per line, whitespace trimmed, blank lines dropped
pub fn parse_manifest(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_manifest(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::manifest(path, e.to_string()))
}
